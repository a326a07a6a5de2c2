use crate::domain::value_objects::ItemCode;
use crate::ports::catalog::{Catalog as CatalogTrait, Result};
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL implementation of Catalog
///
/// Reads the `books` table owned by the catalog context.
pub struct Catalog {
    pool: PgPool,
}

impl Catalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogTrait for Catalog {
    async fn item_exists(&self, item_code: &ItemCode) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE code = $1)")
            .bind(item_code.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
