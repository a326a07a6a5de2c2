use crate::domain::commands::{BorrowItem, ReturnItem};
use crate::domain::loan::{self, ClosedLoan, Loan, OpenLoan};
use crate::domain::value_objects::{InvalidInput, ItemCode, MemberId};
use crate::domain::CloseLoanError;
use crate::ports::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::errors::{LendingError, Result};

/// 1操作あたりの既定のタイムアウト
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// ストアはグローバルではなく、呼び出し側が構築して明示的に渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub loan_store: Arc<dyn LoanStore>,
    pub catalog: Arc<dyn Catalog>,
    pub member_directory: Arc<dyn MemberDirectory>,
    /// 1操作全体（外部問い合わせとトランザクションを含む）の上限時間
    pub operation_timeout: Duration,
}

impl ServiceDependencies {
    pub fn new(
        loan_store: Arc<dyn LoanStore>,
        catalog: Arc<dyn Catalog>,
        member_directory: Arc<dyn MemberDirectory>,
    ) -> Self {
        Self {
            loan_store,
            catalog,
            member_directory,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }
}

/// 資料を貸し出す
///
/// ビジネスルール（この順に検査し、それぞれ別のエラーになる）：
/// - 資料が存在すること
/// - 会員が存在すること
/// - 資料に貸出中レコードがないこと
///
/// 識別子の形式は `BorrowItem::parse` の時点で検証済み。
///
/// # 一貫性保証
///
/// 貸出中レコードの確認と追加は、資料コード単位の1つのトランザクション内で行う。
/// さらにストアの一意制約が同一資料の2件目の貸出中レコードを拒否し、
/// その競合は `AlreadyBorrowed` に変換される。
///
/// # 戻り値
/// 作成された貸出中レコード
#[tracing::instrument(skip_all, fields(item_code = %cmd.item_code, member_id = %cmd.member_id))]
pub async fn borrow_item(deps: &ServiceDependencies, cmd: BorrowItem) -> Result<OpenLoan> {
    with_timeout(deps.operation_timeout, borrow_item_in_store(deps, cmd)).await
}

async fn borrow_item_in_store(deps: &ServiceDependencies, cmd: BorrowItem) -> Result<OpenLoan> {
    // 1. 資料の存在確認
    ensure_item_exists(deps, &cmd.item_code).await?;

    // 2. 会員の存在確認
    ensure_member_exists(deps, cmd.member_id).await?;

    // 3. 資料単位のトランザクション内で確認と追加を行う
    let mut tx = deps
        .loan_store
        .begin(&cmd.item_code)
        .await
        .map_err(storage_unavailable)?;

    let existing = tx
        .find_open_loan(&cmd.item_code)
        .await
        .map_err(storage_unavailable)?;

    if let Some(existing) = existing {
        discard(tx).await;
        tracing::debug!(loan_id = %existing.loan_id.value(), "item already on loan");
        return Err(LendingError::AlreadyBorrowed(cmd.item_code));
    }

    let open_loan = match tx
        .insert_open_loan(&cmd.item_code, cmd.member_id, cmd.borrowed_on)
        .await
    {
        Ok(open_loan) => open_loan,
        Err(LoanStoreError::Conflict) => {
            // トランザクションは drop でロールバックされる
            tracing::warn!("open loan conflict detected by store");
            return Err(LendingError::AlreadyBorrowed(cmd.item_code));
        }
        // 存在確認の後に資料・会員が削除された場合（再試行しても結果は同じ）
        Err(LoanStoreError::UnknownItem) => {
            tracing::warn!("item disappeared after existence check");
            return Err(LendingError::ItemNotFound(cmd.item_code));
        }
        Err(LoanStoreError::UnknownMember) => {
            tracing::warn!("member disappeared after existence check");
            return Err(LendingError::MemberNotFound(cmd.member_id));
        }
        Err(err) => return Err(storage_unavailable(err)),
    };

    // 4. コミット時の一意制約違反も同じ業務エラーとして扱う
    match tx.commit().await {
        Ok(()) => {}
        Err(LoanStoreError::Conflict) => {
            tracing::warn!("open loan conflict detected at commit");
            return Err(LendingError::AlreadyBorrowed(cmd.item_code));
        }
        Err(err) => return Err(storage_unavailable(err)),
    }

    tracing::info!(
        loan_id = %open_loan.loan_id.value(),
        borrowed_on = %open_loan.borrowed_on,
        "item borrowed"
    );

    Ok(open_loan)
}

/// 資料を返却する
///
/// ビジネスルール：
/// - 資料が存在すること
/// - 資料に貸出中レコードがあること
/// - 返却日が貸出日以降であること
///
/// 貸出中レコードの確認と更新は資料コード単位のトランザクション内で行い、
/// 変更されるのはその資料の唯一の貸出中レコードだけである。
///
/// # 戻り値
/// 返却済みになった貸出
#[tracing::instrument(skip_all, fields(item_code = %cmd.item_code))]
pub async fn return_item(deps: &ServiceDependencies, cmd: ReturnItem) -> Result<ClosedLoan> {
    with_timeout(deps.operation_timeout, return_item_in_store(deps, cmd)).await
}

async fn return_item_in_store(deps: &ServiceDependencies, cmd: ReturnItem) -> Result<ClosedLoan> {
    // 1. 資料の存在確認
    ensure_item_exists(deps, &cmd.item_code).await?;

    // 2. 貸出中レコードの確認
    let mut tx = deps
        .loan_store
        .begin(&cmd.item_code)
        .await
        .map_err(storage_unavailable)?;

    let open_loan = match tx
        .find_open_loan(&cmd.item_code)
        .await
        .map_err(storage_unavailable)?
    {
        Some(open_loan) => open_loan,
        None => {
            discard(tx).await;
            return Err(LendingError::NotCurrentlyBorrowed(cmd.item_code));
        }
    };

    // 3. ドメイン層の純粋関数で返却日を検証
    let loan_id = open_loan.loan_id;
    if let Err(CloseLoanError::ReturnedBeforeBorrowed {
        borrowed_on,
        returned_on,
    }) = loan::close_loan(open_loan, cmd.returned_on)
    {
        discard(tx).await;
        return Err(LendingError::InvalidInput(InvalidInput::ReturnBeforeBorrow {
            borrowed_on,
            returned_on,
        }));
    }

    // 4. 貸出中レコードを返却済みにする
    let closed_loan = match tx.close_loan(loan_id, cmd.returned_on).await {
        Ok(closed_loan) => closed_loan,
        Err(LoanStoreError::NotFound | LoanStoreError::Conflict) => {
            tracing::warn!(loan_id = %loan_id.value(), "open loan vanished before close");
            return Err(LendingError::NotCurrentlyBorrowed(cmd.item_code));
        }
        Err(err) => return Err(storage_unavailable(err)),
    };

    tx.commit().await.map_err(storage_unavailable)?;

    tracing::info!(
        loan_id = %loan_id.value(),
        member_id = %closed_loan.member_id,
        returned_on = %closed_loan.returned_on,
        "item returned"
    );

    Ok(closed_loan)
}

/// すべての貸出記録を取得する（レポート用）
///
/// 貸出・返却のプロトコルには関与しない。
pub async fn list_loans(deps: &ServiceDependencies) -> Result<Vec<Loan>> {
    with_timeout(deps.operation_timeout, async {
        deps.loan_store
            .list_all()
            .await
            .map_err(storage_unavailable)
    })
    .await
}

async fn ensure_item_exists(deps: &ServiceDependencies, item_code: &ItemCode) -> Result<()> {
    let exists = deps.catalog.item_exists(item_code).await.map_err(|e| {
        tracing::error!(error = %e, "catalog lookup failed");
        LendingError::StorageUnavailable(e)
    })?;

    if !exists {
        return Err(LendingError::ItemNotFound(item_code.clone()));
    }
    Ok(())
}

async fn ensure_member_exists(deps: &ServiceDependencies, member_id: MemberId) -> Result<()> {
    let exists = deps
        .member_directory
        .member_exists(member_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "member lookup failed");
            LendingError::StorageUnavailable(e)
        })?;

    if !exists {
        return Err(LendingError::MemberNotFound(member_id));
    }
    Ok(())
}

/// 結果が確定した後のロールバック
///
/// 失敗しても業務上の結果は変えない。トランザクションは drop で破棄される。
async fn discard(tx: Box<dyn LoanTransaction>) {
    if let Err(err) = tx.rollback().await {
        tracing::warn!(error = %err, "rollback failed; transaction dropped");
    }
}

fn storage_unavailable(err: LoanStoreError) -> LendingError {
    tracing::error!(error = %err, "loan store operation failed");
    LendingError::StorageUnavailable(Box::new(err))
}

/// 期限内に終わらない操作は `StorageUnavailable` にする
///
/// 中断されたトランザクションは drop によりロールバックされる。
async fn with_timeout<T>(limit: Duration, operation: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(elapsed) => {
            tracing::error!(timeout_ms = limit.as_millis() as u64, "lending operation timed out");
            Err(LendingError::StorageUnavailable(Box::new(elapsed)))
        }
    }
}
