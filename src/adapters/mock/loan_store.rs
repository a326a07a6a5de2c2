use crate::domain::loan::{self, ClosedLoan, Loan, OpenLoan};
use crate::domain::value_objects::{ItemCode, LoanDate, LoanId, MemberId};
use crate::ports::loan_store::{
    LoanStore as LoanStoreTrait, LoanStoreError, LoanTransaction, Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// LoanStoreのインメモリ実装
///
/// 1つの非同期Mutexで表全体を保護する。トランザクションはコミット・ロールバック・
/// dropまでガードを保持するため、トランザクション同士は完全に直列化される。
/// トランザクション内の書き込みは表のコピーに対して行い、コミット時に反映する。
pub struct LoanStore {
    loans: Arc<Mutex<Vec<Loan>>>,
    unavailable: AtomicBool,
    latency: Duration,
}

impl LoanStore {
    pub fn new() -> Self {
        Self {
            loans: Arc::new(Mutex::new(Vec::new())),
            unavailable: AtomicBool::new(false),
            latency: Duration::ZERO,
        }
    }

    /// 読み取りのたびに待機を入れ、並行テストで呼び出しを重ならせる
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 以降の操作をストア障害として失敗させる
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LoanStoreError::unavailable("loan store unavailable"));
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for LoanStore {
    fn default() -> Self {
        Self::new()
    }
}

fn find_open(loans: &[Loan], item_code: &ItemCode) -> Option<OpenLoan> {
    loans.iter().find_map(|loan| match loan {
        Loan::Open(open) if &open.item_code == item_code => Some(open.clone()),
        _ => None,
    })
}

/// PostgreSQLの部分一意インデックスと同じ規則を適用する
fn insert_open(
    loans: &mut Vec<Loan>,
    item_code: &ItemCode,
    member_id: MemberId,
    borrowed_on: LoanDate,
) -> Result<OpenLoan> {
    if find_open(loans, item_code).is_some() {
        return Err(LoanStoreError::Conflict);
    }
    let open = loan::open_loan(item_code.clone(), member_id, borrowed_on);
    loans.push(Loan::Open(open.clone()));
    Ok(open)
}

fn close_open(loans: &mut [Loan], loan_id: LoanId, returned_on: LoanDate) -> Result<ClosedLoan> {
    let slot = loans
        .iter_mut()
        .find(|loan| loan.is_open() && loan.loan_id() == loan_id)
        .ok_or(LoanStoreError::NotFound)?;

    let Loan::Open(open) = slot.clone() else {
        return Err(LoanStoreError::NotFound);
    };
    let closed = loan::close_loan(open, returned_on)
        .map_err(|e| LoanStoreError::InvalidRecord(format!("{:?}", e)))?;
    *slot = Loan::Closed(closed.clone());
    Ok(closed)
}

#[async_trait]
impl LoanStoreTrait for LoanStore {
    async fn begin(&self, _item_code: &ItemCode) -> Result<Box<dyn LoanTransaction>> {
        self.check_available()?;
        let guard = self.loans.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(Transaction {
            guard,
            staged,
            latency: self.latency,
        }))
    }

    async fn find_open_loan(&self, item_code: &ItemCode) -> Result<Option<OpenLoan>> {
        self.check_available()?;
        self.simulate_latency().await;
        Ok(find_open(&self.loans.lock().await, item_code))
    }

    async fn insert_open_loan(
        &self,
        item_code: &ItemCode,
        member_id: MemberId,
        borrowed_on: LoanDate,
    ) -> Result<OpenLoan> {
        self.check_available()?;
        insert_open(&mut *self.loans.lock().await, item_code, member_id, borrowed_on)
    }

    async fn close_loan(&self, loan_id: LoanId, returned_on: LoanDate) -> Result<ClosedLoan> {
        self.check_available()?;
        close_open(&mut self.loans.lock().await, loan_id, returned_on)
    }

    async fn list_all(&self) -> Result<Vec<Loan>> {
        self.check_available()?;
        let mut loans = self.loans.lock().await.clone();
        loans.sort_by(|a, b| {
            (a.borrowed_on(), a.item_code()).cmp(&(b.borrowed_on(), b.item_code()))
        });
        Ok(loans)
    }
}

struct Transaction {
    guard: OwnedMutexGuard<Vec<Loan>>,
    staged: Vec<Loan>,
    latency: Duration,
}

#[async_trait]
impl LoanTransaction for Transaction {
    async fn find_open_loan(&mut self, item_code: &ItemCode) -> Result<Option<OpenLoan>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(find_open(&self.staged, item_code))
    }

    async fn insert_open_loan(
        &mut self,
        item_code: &ItemCode,
        member_id: MemberId,
        borrowed_on: LoanDate,
    ) -> Result<OpenLoan> {
        insert_open(&mut self.staged, item_code, member_id, borrowed_on)
    }

    async fn close_loan(&mut self, loan_id: LoanId, returned_on: LoanDate) -> Result<ClosedLoan> {
        close_open(&mut self.staged, loan_id, returned_on)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let Transaction {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
