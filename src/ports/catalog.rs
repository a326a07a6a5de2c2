use crate::domain::value_objects::ItemCode;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// カタログポート
///
/// 貸出コンテキストとカタログコンテキストの境界を維持する。
/// 貸出コンテキストは資料コードのみを知り、書誌情報は知らない。
#[async_trait]
pub trait Catalog: Send + Sync {
    /// 資料が存在するか確認する
    ///
    /// 問い合わせ自体の失敗は `Err` で返す。`Ok(false)` は「存在しない」ことだけを意味する。
    async fn item_exists(&self, item_code: &ItemCode) -> Result<bool>;
}
