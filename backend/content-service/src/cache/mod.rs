/// Content caching layer
///
/// This module provides:
/// - The per-kind cache contract used by the content service
/// - A Redis hash implementation with TTL
/// - The deterministic cache key scheme
use crate::models::{Content, FieldError, FieldValue, NaturalKey};
use async_trait::async_trait;

pub mod content_cache;
pub mod keys;

pub use content_cache::RedisContentCache;
pub use keys::CacheKey;

/// Default time-to-live for cached records.
pub const DEFAULT_TTL_SECS: u64 = 3600;

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("Cache miss")]
    NotFound,

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid cache data: {0}")]
    Decode(String),
}

impl From<FieldError> for CacheError {
    fn from(err: FieldError) -> Self {
        CacheError::Decode(err.to_string())
    }
}

/// Advisory per-entity mirror of store records for one content kind.
#[async_trait]
pub trait ContentCache<T: Content>: Send + Sync {
    /// Replace the whole record for the item's key.
    async fn put(&self, item: &T) -> Result<(), CacheError>;

    async fn get(&self, key: &NaturalKey) -> Result<T, CacheError>;

    /// Set one field on an existing record. Returns false when no record
    /// exists, in which case nothing is written.
    async fn patch_field(
        &self,
        key: &NaturalKey,
        field: &str,
        value: &FieldValue,
    ) -> Result<bool, CacheError>;

    async fn delete(&self, key: &NaturalKey) -> Result<(), CacheError>;
}
