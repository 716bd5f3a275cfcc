/// Deadlines for async operations
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutError {
    #[error("Operation timed out after {0:?}")]
    Elapsed(Duration),
    #[error("Shared deadline exceeded")]
    DeadlineExceeded,
}

/// Execute a future with a relative timeout
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    timeout(duration, future)
        .await
        .map_err(|_| TimeoutError::Elapsed(duration))
}

/// Execute a future against an absolute deadline.
///
/// Several tasks can share one `Instant` so they all expire together.
pub async fn with_deadline<F, T>(deadline: Instant, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    timeout_at(deadline, future)
        .await
        .map_err(|_| TimeoutError::DeadlineExceeded)
}
