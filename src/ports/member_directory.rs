use crate::domain::value_objects::MemberId;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 会員名簿ポート
///
/// 貸出コンテキストと会員コンテキストの境界を維持する。
/// 貸出コンテキストは会員IDのみを知り、会員詳細は知らない。
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// 会員が存在するか確認する
    ///
    /// 貸出作成前の会員バリデーションに使用される。
    /// 接続障害などは `Ok(false)` ではなく `Err` で返すこと。
    async fn member_exists(&self, member_id: MemberId) -> Result<bool>;
}
