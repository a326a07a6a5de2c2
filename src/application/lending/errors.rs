use crate::domain::value_objects::{InvalidInput, ItemCode, MemberId};
use thiserror::Error;

/// 貸出管理アプリケーション層のエラー
///
/// ストアで検出された競合はここに現れず、対応する業務エラーに変換される。
#[derive(Debug, Error)]
pub enum LendingError {
    /// 識別子や日付が不正
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// 資料が存在しない
    #[error("Item not found: {0}")]
    ItemNotFound(ItemCode),

    /// 会員が存在しない
    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    /// 資料は既に貸出中
    #[error("Item is already borrowed: {0}")]
    AlreadyBorrowed(ItemCode),

    /// 資料は貸出中ではない
    #[error("Item is not currently borrowed: {0}")]
    NotCurrentlyBorrowed(ItemCode),

    /// ストアまたは外部サービスの一時的な障害（タイムアウトを含む）
    #[error("Storage unavailable")]
    StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LendingError {
    /// 呼び出し側で再試行してよいか
    ///
    /// 業務ルール違反は決定的なので再試行しても結果は変わらない。
    pub fn is_retryable(&self) -> bool {
        matches!(self, LendingError::StorageUnavailable(_))
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LendingError>;
