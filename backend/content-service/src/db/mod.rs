/// Database access layer
///
/// This module provides:
/// - The per-kind repository contract used by the content service
/// - A Postgres implementation built on the static field schema
/// - Startup table creation
use crate::models::{Content, Filter, NaturalKey, Patch};
use async_trait::async_trait;

pub mod content_repo;
pub mod schema;

pub use content_repo::PgContentRepository;
pub use schema::ensure_schema;

/// Fixed page size for multi-record reads.
pub const PAGE_SIZE: i64 = 20;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate natural key")]
    DuplicateKey,
    #[error("record not found")]
    NotFound,
    #[error("store I/O error: {0}")]
    Io(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::DuplicateKey
            }
            _ => StoreError::Io(err.to_string()),
        }
    }
}

/// Durable CRUD for one content kind.
#[async_trait]
pub trait ContentRepository<T: Content>: Send + Sync {
    async fn create(&self, item: &T) -> Result<(), StoreError>;

    /// Apply `patch` to the record with `key`; returns the matched count.
    async fn update(&self, key: &NaturalKey, patch: &Patch) -> Result<u64, StoreError>;

    /// Returns the deleted count.
    async fn delete(&self, key: &NaturalKey) -> Result<u64, StoreError>;

    async fn find_one(&self, key: &NaturalKey) -> Result<T, StoreError>;

    /// Newest first, at most `limit` records.
    async fn find_many(&self, filter: &Filter, limit: i64) -> Result<Vec<T>, StoreError>;
}
