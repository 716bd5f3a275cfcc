/// Content service - create, update, delete and read one content kind
use super::read_race;
use crate::cache::{CacheError, ContentCache};
use crate::db::{ContentRepository, StoreError, PAGE_SIZE};
use crate::error::{AppError, Result};
use crate::moderation::ModerationSubmitter;
use crate::models::{Content, Filter, NaturalKey, Patch};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument, Span};

/// Default per-operation deadline.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(3000);

/// How a created item became visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateOutcome {
    /// Stored and cached
    Published,
    /// Stored and submitted; cached once approved
    PendingReview,
}

pub struct ContentService<T: Content> {
    repo: Arc<dyn ContentRepository<T>>,
    cache: Arc<dyn ContentCache<T>>,
    submitter: Option<Arc<ModerationSubmitter>>,
    timeout: Duration,
    span: Span,
}

fn store_failure(operation: &str, err: StoreError) -> AppError {
    match err {
        StoreError::DuplicateKey => AppError::AlreadyExists,
        StoreError::NotFound => AppError::NotFound,
        StoreError::Io(detail) => {
            error!(operation, error = %detail, "Repository operation failed");
            AppError::RepositoryFailed
        }
    }
}

fn cache_failure(operation: &str, err: CacheError, mapped: AppError) -> AppError {
    warn!(operation, error = %err, "Cache operation failed");
    mapped
}

impl<T: Content> ContentService<T> {
    pub fn new(
        repo: Arc<dyn ContentRepository<T>>,
        cache: Arc<dyn ContentCache<T>>,
        timeout: Duration,
        span: Span,
    ) -> Self {
        Self {
            repo,
            cache,
            submitter: None,
            timeout,
            span,
        }
    }

    /// Route every create through moderation review.
    pub fn with_moderation(mut self, submitter: Arc<ModerationSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    async fn bounded<F, R>(&self, operation: &'static str, fut: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        let result = resilience::with_timeout(self.timeout, fut)
            .instrument(self.span.clone())
            .await;

        match result {
            Ok(result) => result,
            Err(_) => {
                self.span.in_scope(|| {
                    warn!(
                        operation,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Content operation timed out"
                    )
                });
                Err(AppError::Timeout)
            }
        }
    }

    /// Store a new item. Reviewed kinds are submitted for moderation and
    /// cached on approval; the rest are cached immediately.
    pub async fn create(&self, item: T) -> Result<CreateOutcome> {
        let key = item.natural_key();
        key.validate::<T>()?;

        self.bounded("create", async {
            self.repo
                .create(&item)
                .await
                .map_err(|e| store_failure("create", e))?;

            if let Some(submitter) = &self.submitter {
                submitter.submit(&item).await?;
                info!(key = %key, "Created, pending review");
                return Ok(CreateOutcome::PendingReview);
            }

            self.cache
                .put(&item)
                .await
                .map_err(|e| cache_failure("create", e, AppError::CacheSetFailed))?;

            info!(key = %key, "Created and published");
            Ok(CreateOutcome::Published)
        })
        .await
    }

    /// Apply a patch to the stored record, then mirror each field into the
    /// cached record. The store is not rolled back on a cache failure.
    pub async fn update(&self, key: &NaturalKey, patch: &Patch) -> Result<()> {
        key.validate::<T>()?;
        patch.validate::<T>()?;

        self.bounded("update", async {
            let matched = self
                .repo
                .update(key, patch)
                .await
                .map_err(|e| store_failure("update", e))?;
            if matched == 0 {
                return Err(AppError::NotFound);
            }

            for (field, value) in patch.changes() {
                let applied = self
                    .cache
                    .patch_field(key, field, value)
                    .await
                    .map_err(|e| cache_failure("update", e, AppError::CacheSetFailed))?;
                if !applied {
                    debug!(key = %key, field = %field, "No cached record to patch");
                }
            }

            info!(key = %key, fields = patch.changes().len(), "Updated");
            Ok(())
        })
        .await
    }

    /// Delete the stored record, then its cached record. The store is not
    /// rolled back on a cache failure.
    pub async fn delete(&self, key: &NaturalKey) -> Result<()> {
        key.validate::<T>()?;

        self.bounded("delete", async {
            let deleted = self
                .repo
                .delete(key)
                .await
                .map_err(|e| store_failure("delete", e))?;
            if deleted == 0 {
                return Err(AppError::NotFound);
            }

            self.cache
                .delete(key)
                .await
                .map_err(|e| cache_failure("delete", e, AppError::CacheDelFailed))?;

            info!(key = %key, "Deleted");
            Ok(())
        })
        .await
    }

    /// Read one record by racing the store against the cache.
    pub async fn get_one(&self, key: &NaturalKey) -> Result<T> {
        key.validate::<T>()?;

        read_race::race(
            Arc::clone(&self.repo),
            Arc::clone(&self.cache),
            key.clone(),
            self.timeout,
        )
        .instrument(self.span.clone())
        .await
    }

    /// Newest records matching `filter`, one page. Never consults the cache.
    pub async fn get_many(&self, filter: &Filter) -> Result<Vec<T>> {
        filter.validate::<T>()?;

        self.bounded("get_many", async {
            let items = self
                .repo
                .find_many(filter, PAGE_SIZE)
                .await
                .map_err(|e| store_failure("get_many", e))?;
            if items.is_empty() {
                return Err(AppError::NotFound);
            }
            Ok(items)
        })
        .await
    }

    /// Verdict-side create for an approved item.
    ///
    /// The item normally exists already, so a duplicate key is success. The
    /// cache is filled from the stored record, which may have been updated
    /// since submission. Never resubmits for moderation.
    pub async fn commit(&self, item: T) -> Result<()> {
        let key = item.natural_key();
        key.validate::<T>()?;

        self.bounded("commit", async {
            let stored = match self.repo.create(&item).await {
                Ok(()) => {
                    debug!(key = %key, "Approved item inserted");
                    item
                }
                Err(StoreError::DuplicateKey) => match self.repo.find_one(&key).await {
                    Ok(stored) => {
                        debug!(key = %key, "Approved item already stored");
                        stored
                    }
                    Err(StoreError::NotFound) => {
                        debug!(key = %key, "Approved item removed before commit");
                        return Ok(());
                    }
                    Err(e) => return Err(store_failure("commit", e)),
                },
                Err(e) => return Err(store_failure("commit", e)),
            };

            self.cache
                .put(&stored)
                .await
                .map_err(|e| cache_failure("commit", e, AppError::CacheSetFailed))?;

            info!(key = %key, "Committed approved item");
            Ok(())
        })
        .await
    }

    /// Verdict-side delete for a rejected item. A missing record is success.
    pub async fn rollback(&self, key: &NaturalKey) -> Result<()> {
        key.validate::<T>()?;

        self.bounded("rollback", async {
            let removed = match self.repo.delete(key).await {
                Ok(count) => count > 0,
                Err(StoreError::NotFound) => false,
                Err(e) => return Err(store_failure("rollback", e)),
            };

            match self.cache.delete(key).await {
                Ok(()) => {}
                Err(e) if removed => {
                    return Err(cache_failure("rollback", e, AppError::CacheDelFailed))
                }
                Err(e) => debug!(key = %key, error = %e, "Best-effort cache delete failed"),
            }

            if removed {
                info!(key = %key, "Rolled back rejected item");
            } else {
                debug!(key = %key, "Rejected item already absent");
            }
            Ok(())
        })
        .await
    }
}
