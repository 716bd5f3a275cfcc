use redis::{aio::ConnectionManager, AsyncCommands, Script};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CacheError, CacheKey, ContentCache};
use crate::metrics::content::CACHE_EVENTS;
use crate::models::fields::{decode_record, encode_record};
use crate::models::{Content, FieldValue, NaturalKey};
use async_trait::async_trait;

/// Sets a hash field only when the hash already exists.
const PATCH_IF_EXISTS: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
    return 1
end
return 0
"#;

/// Redis hash cache for one content kind
pub struct RedisContentCache<T> {
    redis: ConnectionManager,
    ttl: Duration,
    patch_script: Script,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Content> RedisContentCache<T> {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self {
            redis,
            ttl: Duration::from_secs(ttl_secs),
            patch_script: Script::new(PATCH_IF_EXISTS),
            _kind: PhantomData,
        }
    }

    fn key(key: &NaturalKey) -> String {
        CacheKey::content(T::KIND, key)
    }

    fn record_event(event: &str) {
        CACHE_EVENTS
            .with_label_values(&[T::KIND.as_str(), event])
            .inc();
    }
}

#[async_trait]
impl<T: Content> ContentCache<T> for RedisContentCache<T> {
    async fn put(&self, item: &T) -> Result<(), CacheError> {
        let key = Self::key(&item.natural_key());
        let fields = encode_record(item)?;
        let mut conn = self.redis.clone();

        redis::pipe()
            .atomic()
            .del(&key)
            .ignore()
            .hset_multiple(&key, fields.as_slice())
            .ignore()
            .expire(&key, self.ttl.as_secs() as i64)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| {
                warn!("Failed to write cache record {}: {}", key, e);
                Self::record_event("write_error");
                CacheError::Redis(e)
            })?;

        debug!("Cache WRITE {} with TTL {:?}", key, self.ttl);
        Ok(())
    }

    async fn get(&self, key: &NaturalKey) -> Result<T, CacheError> {
        let key = Self::key(key);
        let mut conn = self.redis.clone();

        let record: HashMap<String, String> = conn.hgetall(&key).await.map_err(|e| {
            Self::record_event("error");
            CacheError::Redis(e)
        })?;

        if record.is_empty() {
            debug!("Cache MISS {}", key);
            Self::record_event("miss");
            return Err(CacheError::NotFound);
        }

        match decode_record::<T>(&record) {
            Ok(item) => {
                debug!("Cache HIT {}", key);
                Self::record_event("hit");
                Ok(item)
            }
            Err(e) => {
                warn!("Undecodable cache record {}: {}", key, e);
                Self::record_event("decode_error");
                Err(e.into())
            }
        }
    }

    async fn patch_field(
        &self,
        key: &NaturalKey,
        field: &str,
        value: &FieldValue,
    ) -> Result<bool, CacheError> {
        let key = Self::key(key);
        let mut conn = self.redis.clone();

        let applied: i64 = self
            .patch_script
            .key(&key)
            .arg(field)
            .arg(value.encode())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!("Failed to patch cache record {}: {}", key, e);
                Self::record_event("write_error");
                CacheError::Redis(e)
            })?;

        Ok(applied == 1)
    }

    async fn delete(&self, key: &NaturalKey) -> Result<(), CacheError> {
        let key = Self::key(key);
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(&key).await.map_err(|e| {
            warn!("Failed to delete cache record {}: {}", key, e);
            CacheError::Redis(e)
        })?;

        debug!("Cache DELETE {}", key);
        Ok(())
    }
}
