use crate::domain::value_objects::MemberId;
use crate::ports::member_directory::{MemberDirectory as MemberDirectoryTrait, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// MemberDirectoryのモック実装
///
/// 会員IDを保存することで状態を持ったテストをサポート。
pub struct MemberDirectory {
    members: Mutex<HashSet<MemberId>>,
    unavailable: AtomicBool,
}

impl MemberDirectory {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// テスト用に会員を登録
    pub fn add_member(&self, member_id: MemberId) {
        self.members.lock().unwrap().insert(member_id);
    }

    /// 以降の問い合わせを会員名簿の障害として失敗させる
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl Default for MemberDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemberDirectoryTrait for MemberDirectory {
    async fn member_exists(&self, member_id: MemberId) -> Result<bool> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err("member directory unavailable".into());
        }
        Ok(self.members.lock().unwrap().contains(&member_id))
    }
}
