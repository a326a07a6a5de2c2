use crate::domain::value_objects::MemberId;
use crate::ports::member_directory::{MemberDirectory as MemberDirectoryTrait, Result};
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL implementation of MemberDirectory
///
/// Reads the `members` table owned by the member context.
pub struct MemberDirectory {
    pool: PgPool,
}

impl MemberDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberDirectoryTrait for MemberDirectory {
    async fn member_exists(&self, member_id: MemberId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE id = $1)")
            .bind(member_id.value())
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
