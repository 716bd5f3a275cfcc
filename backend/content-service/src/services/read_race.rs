/// Concurrent store/cache read for a single record
///
/// Both arms run as independent tasks under one shared deadline and report
/// into one fan-in channel. The losing arm is never cancelled; it finishes on
/// its own or at the deadline.
use crate::cache::{CacheError, ContentCache};
use crate::db::{ContentRepository, StoreError};
use crate::error::{AppError, Result};
use crate::metrics::content::READ_SOURCE;
use crate::models::{Content, NaturalKey};
use resilience::with_deadline;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Store,
    Cache,
}

impl Source {
    fn as_str(self) -> &'static str {
        match self {
            Source::Store => "store",
            Source::Cache => "cache",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArmError {
    NotFound,
    Failed,
    TimedOut,
}

struct ArmReport<T> {
    source: Source,
    outcome: std::result::Result<T, ArmError>,
}

fn record_source<T: Content>(source: &str) {
    READ_SOURCE
        .with_label_values(&[T::KIND.as_str(), source])
        .inc();
}

/// Race the store and the cache for `key`.
///
/// - The first success wins; a store success already queued beats a cache win.
/// - Cache failures (miss, I/O, undecodable record, record for another key)
///   are soft.
/// - A store failure waits for the cache arm.
/// - Both failed: store `NotFound` gives `NotFound`, a store deadline overrun
///   gives `Timeout`, anything else gives `Internal`.
/// - The fan-in deadline elapsing first gives `Timeout`.
pub(crate) async fn race<T: Content>(
    repo: Arc<dyn ContentRepository<T>>,
    cache: Arc<dyn ContentCache<T>>,
    key: NaturalKey,
    timeout: Duration,
) -> Result<T> {
    let deadline = Instant::now() + timeout;
    let (tx, mut rx) = mpsc::channel::<ArmReport<T>>(2);

    let store_tx = tx.clone();
    let store_key = key.clone();
    tokio::spawn(
        async move {
            let outcome = match with_deadline(deadline, repo.find_one(&store_key)).await {
                Ok(Ok(item)) => Ok(item),
                Ok(Err(StoreError::NotFound)) => Err(ArmError::NotFound),
                Ok(Err(e)) => {
                    warn!(key = %store_key, error = %e, "Store read failed");
                    Err(ArmError::Failed)
                }
                Err(_) => Err(ArmError::TimedOut),
            };
            let _ = store_tx
                .send(ArmReport {
                    source: Source::Store,
                    outcome,
                })
                .await;
        }
        .in_current_span(),
    );

    let cache_key = key.clone();
    tokio::spawn(
        async move {
            let outcome = match with_deadline(deadline, cache.get(&cache_key)).await {
                Ok(Ok(item)) if item.natural_key() == cache_key => Ok(item),
                // key parts containing ':' can collide on one cache key
                Ok(Ok(item)) => {
                    warn!(key = %cache_key, cached = %item.natural_key(), "Cached record belongs to another key");
                    Err(ArmError::NotFound)
                }
                Ok(Err(CacheError::NotFound)) => Err(ArmError::NotFound),
                Ok(Err(e)) => {
                    debug!(key = %cache_key, error = %e, "Cache read failed");
                    Err(ArmError::Failed)
                }
                Err(_) => Err(ArmError::TimedOut),
            };
            let _ = tx
                .send(ArmReport {
                    source: Source::Cache,
                    outcome,
                })
                .await;
        }
        .in_current_span(),
    );

    let mut store_error = None;

    loop {
        let report = match with_deadline(deadline, rx.recv()).await {
            Ok(Some(report)) => report,
            // both arms have reported
            Ok(None) => break,
            Err(_) => {
                warn!(key = %key, timeout_ms = timeout.as_millis() as u64, "Read race deadline exceeded");
                record_source::<T>("none");
                return Err(AppError::Timeout);
            }
        };

        match report.outcome {
            Ok(item) => {
                if report.source == Source::Cache {
                    if let Ok(ArmReport {
                        source: Source::Store,
                        outcome: Ok(stored),
                    }) = rx.try_recv()
                    {
                        record_source::<T>(Source::Store.as_str());
                        return Ok(stored);
                    }
                }
                record_source::<T>(report.source.as_str());
                return Ok(item);
            }
            Err(e) => {
                debug!(key = %key, source = report.source.as_str(), error = ?e, "Read arm failed");
                if report.source == Source::Store {
                    store_error = Some(e);
                }
            }
        }
    }

    record_source::<T>("none");
    match store_error {
        Some(ArmError::NotFound) => Err(AppError::NotFound),
        Some(ArmError::TimedOut) => Err(AppError::Timeout),
        _ => Err(AppError::Internal("both read sources failed".to_string())),
    }
}
