use crate::domain::loan::{ClosedLoan, Loan, OpenLoan};
use crate::domain::value_objects::{ItemCode, LoanDate, LoanId, MemberId};
use async_trait::async_trait;
use thiserror::Error;

/// 貸出ストアのエラー
#[derive(Debug, Error)]
pub enum LoanStoreError {
    /// 同一資料の貸出中レコードが既に存在する（一意制約違反など）
    #[error("conflicting open loan for item")]
    Conflict,

    /// 対象の貸出中レコードが存在しない
    #[error("open loan not found")]
    NotFound,

    /// 参照先の資料がカタログから消えている（外部キー違反）
    #[error("referenced item does not exist")]
    UnknownItem,

    /// 参照先の会員が名簿から消えている（外部キー違反）
    #[error("referenced member does not exist")]
    UnknownMember,

    /// 保存されたレコードが不変条件を満たさない
    #[error("invalid loan record: {0}")]
    InvalidRecord(String),

    /// ストアに到達できない、またはタイムアウトした
    #[error("loan store unavailable")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LoanStoreError {
    pub fn unavailable<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        LoanStoreError::Unavailable(err.into())
    }
}

pub type Result<T> = std::result::Result<T, LoanStoreError>;

/// 貸出ストアポート
///
/// 貸出記録の唯一の永続保持者。資料ごとの貸出中レコードは高々1件であることを
/// ストア自身が保証する（複数プロセスから同時に呼ばれても破られない）。
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// 資料コード単位のトランザクションを開始する
    ///
    /// 返されたトランザクションが commit / rollback / drop されるまで、
    /// 同じ資料コードに対する他のトランザクションは待たされる。
    async fn begin(&self, item_code: &ItemCode) -> Result<Box<dyn LoanTransaction>>;

    /// 資料の貸出中レコードを取得する
    async fn find_open_loan(&self, item_code: &ItemCode) -> Result<Option<OpenLoan>>;

    /// 貸出中レコードを追加する
    ///
    /// 既に貸出中レコードがある場合は `LoanStoreError::Conflict`。
    async fn insert_open_loan(
        &self,
        item_code: &ItemCode,
        member_id: MemberId,
        borrowed_on: LoanDate,
    ) -> Result<OpenLoan>;

    /// 貸出中レコードを返却済みにする
    ///
    /// 対象が存在しないか既に返却済みなら `LoanStoreError::NotFound`。
    async fn close_loan(&self, loan_id: LoanId, returned_on: LoanDate) -> Result<ClosedLoan>;

    /// すべての貸出記録を列挙する（レポート用、読み取り専用）
    ///
    /// 貸出日、資料コードの順に並ぶ。
    async fn list_all(&self) -> Result<Vec<Loan>>;
}

/// 資料コード単位のトランザクション
///
/// commit せずに drop した場合、書き込みはすべて破棄される。
#[async_trait]
pub trait LoanTransaction: Send {
    async fn find_open_loan(&mut self, item_code: &ItemCode) -> Result<Option<OpenLoan>>;

    async fn insert_open_loan(
        &mut self,
        item_code: &ItemCode,
        member_id: MemberId,
        borrowed_on: LoanDate,
    ) -> Result<OpenLoan>;

    async fn close_loan(&mut self, loan_id: LoanId, returned_on: LoanDate) -> Result<ClosedLoan>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
