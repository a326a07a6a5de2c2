use crate::domain::value_objects::ItemCode;
use crate::ports::catalog::{Catalog as CatalogTrait, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Catalogのモック実装
///
/// 資料コードを保存することで状態を持ったテストをサポート。
/// 障害モードに切り替えると、すべての問い合わせが失敗する。
pub struct Catalog {
    items: Mutex<HashSet<ItemCode>>,
    unavailable: AtomicBool,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// テスト用に資料を登録
    pub fn add_item(&self, item_code: ItemCode) {
        self.items.lock().unwrap().insert(item_code);
    }

    /// 以降の問い合わせをカタログ障害として失敗させる
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogTrait for Catalog {
    async fn item_exists(&self, item_code: &ItemCode) -> Result<bool> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err("catalog unavailable".into());
        }
        Ok(self.items.lock().unwrap().contains(item_code))
    }
}
