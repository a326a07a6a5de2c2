use crate::domain::loan::{self, ClosedLoan, Loan, OpenLoan};
use crate::domain::value_objects::{ItemCode, LoanDate, LoanId, MemberId};
use crate::ports::loan_store::{
    LoanStore as LoanStoreTrait, LoanStoreError, LoanTransaction, Result,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Postgres, Row, error::ErrorKind, postgres::PgRow};
use uuid::Uuid;

const LOAN_COLUMNS: &str = "loan_id, item_code, member_id, borrowed_on, returned_on";
const ITEM_FOREIGN_KEY: &str = "loans_item_code_fkey";
const MEMBER_FOREIGN_KEY: &str = "loans_member_id_fkey";

/// Map a sqlx error to the store's error taxonomy
///
/// A unique violation can only come from `loans_one_open_per_item` (or the
/// primary key, which uses random UUIDs), so it is reported as a conflict.
/// A foreign key violation means the book or member row was deleted after the
/// existence check; it is deterministic and must not look like an outage.
fn map_sqlx_error(err: sqlx::Error) -> LoanStoreError {
    if let Some(db_err) = err.as_database_error() {
        match db_err.kind() {
            ErrorKind::UniqueViolation => return LoanStoreError::Conflict,
            ErrorKind::ForeignKeyViolation => match db_err.constraint() {
                Some(ITEM_FOREIGN_KEY) => return LoanStoreError::UnknownItem,
                Some(MEMBER_FOREIGN_KEY) => return LoanStoreError::UnknownMember,
                _ => {}
            },
            _ => {}
        }
    }
    LoanStoreError::unavailable(err)
}

/// Convert a PostgreSQL row into a Loan
///
/// Column values are re-validated through the domain value objects, so a
/// corrupted row is reported instead of leaking into the domain.
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let loan_id: Uuid = row.try_get("loan_id").map_err(map_sqlx_error)?;
    let item_code: String = row.try_get("item_code").map_err(map_sqlx_error)?;
    let member_id: i32 = row.try_get("member_id").map_err(map_sqlx_error)?;
    let borrowed_on: NaiveDate = row.try_get("borrowed_on").map_err(map_sqlx_error)?;
    let returned_on: Option<NaiveDate> = row.try_get("returned_on").map_err(map_sqlx_error)?;

    let item_code = ItemCode::parse(&item_code)
        .map_err(|e| LoanStoreError::InvalidRecord(e.to_string()))?;

    Loan::from_parts(
        LoanId::from_uuid(loan_id),
        item_code,
        MemberId::new(member_id),
        LoanDate::new(borrowed_on),
        returned_on.map(LoanDate::new),
    )
    .map_err(|e| LoanStoreError::InvalidRecord(format!("{:?}", e)))
}

fn expect_open(loan: Loan) -> Result<OpenLoan> {
    match loan {
        Loan::Open(open) => Ok(open),
        Loan::Closed(closed) => Err(LoanStoreError::InvalidRecord(format!(
            "loan {} is already closed",
            closed.loan_id.value()
        ))),
    }
}

fn expect_closed(loan: Loan) -> Result<ClosedLoan> {
    match loan {
        Loan::Closed(closed) => Ok(closed),
        Loan::Open(open) => Err(LoanStoreError::InvalidRecord(format!(
            "loan {} is still open",
            open.loan_id.value()
        ))),
    }
}

async fn find_open_loan_in(
    conn: &mut PgConnection,
    item_code: &ItemCode,
) -> Result<Option<OpenLoan>> {
    let sql =
        format!("SELECT {LOAN_COLUMNS} FROM loans WHERE item_code = $1 AND returned_on IS NULL");
    let row = sqlx::query(&sql)
        .bind(item_code.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    row.as_ref()
        .map(|row| map_row_to_loan(row).and_then(expect_open))
        .transpose()
}

async fn insert_open_loan_in(
    conn: &mut PgConnection,
    item_code: &ItemCode,
    member_id: MemberId,
    borrowed_on: LoanDate,
) -> Result<OpenLoan> {
    let open = loan::open_loan(item_code.clone(), member_id, borrowed_on);

    sqlx::query(
        r#"
        INSERT INTO loans (loan_id, item_code, member_id, borrowed_on)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(open.loan_id.value())
    .bind(open.item_code.as_str())
    .bind(open.member_id.value())
    .bind(open.borrowed_on.value())
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(open)
}

/// Only rows that are still open are updated, so a loan is closed at most once
async fn close_loan_in(
    conn: &mut PgConnection,
    loan_id: LoanId,
    returned_on: LoanDate,
) -> Result<ClosedLoan> {
    let sql = format!(
        r#"
        UPDATE loans
        SET returned_on = $2
        WHERE loan_id = $1 AND returned_on IS NULL
        RETURNING {LOAN_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(loan_id.value())
        .bind(returned_on.value())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(LoanStoreError::NotFound)?;

    map_row_to_loan(&row).and_then(expect_closed)
}

/// PostgreSQL implementation of LoanStore
///
/// The single-open-loan rule is enforced twice: `begin` serializes callers on
/// a transaction-scoped advisory lock keyed by the item code, and the partial
/// unique index `loans_one_open_per_item` rejects any second open row that
/// bypasses the lock.
pub struct LoanStore {
    pool: PgPool,
}

impl LoanStore {
    /// Create a new LoanStore with a PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStoreTrait for LoanStore {
    /// Start a transaction holding the item's advisory lock
    ///
    /// Row locks cannot protect an item that has no loan rows yet, so the lock
    /// is taken on a hash of the item code. It is released on commit or rollback.
    async fn begin(&self, item_code: &ItemCode) -> Result<Box<dyn LoanTransaction>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(item_code.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Box::new(Transaction { tx }))
    }

    async fn find_open_loan(&self, item_code: &ItemCode) -> Result<Option<OpenLoan>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        find_open_loan_in(&mut conn, item_code).await
    }

    async fn insert_open_loan(
        &self,
        item_code: &ItemCode,
        member_id: MemberId,
        borrowed_on: LoanDate,
    ) -> Result<OpenLoan> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        insert_open_loan_in(&mut conn, item_code, member_id, borrowed_on).await
    }

    async fn close_loan(&self, loan_id: LoanId, returned_on: LoanDate) -> Result<ClosedLoan> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        close_loan_in(&mut conn, loan_id, returned_on).await
    }

    async fn list_all(&self) -> Result<Vec<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans ORDER BY borrowed_on ASC, item_code ASC, loan_id ASC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_loan).collect()
    }
}

/// Item-scoped transaction; dropping it without commit rolls back
struct Transaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl LoanTransaction for Transaction {
    async fn find_open_loan(&mut self, item_code: &ItemCode) -> Result<Option<OpenLoan>> {
        find_open_loan_in(&mut self.tx, item_code).await
    }

    async fn insert_open_loan(
        &mut self,
        item_code: &ItemCode,
        member_id: MemberId,
        borrowed_on: LoanDate,
    ) -> Result<OpenLoan> {
        insert_open_loan_in(&mut self.tx, item_code, member_id, borrowed_on).await
    }

    async fn close_loan(&mut self, loan_id: LoanId, returned_on: LoanDate) -> Result<ClosedLoan> {
        close_loan_in(&mut self.tx, loan_id, returned_on).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}
