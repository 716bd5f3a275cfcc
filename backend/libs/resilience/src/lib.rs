/// Resilience helpers for service bootstrap and request deadlines
///
/// - **Retry**: bounded attempts with a fixed backoff, used for the
///   connection bootstrap of stores, caches and message buses
/// - **Timeout**: per-operation deadlines, either relative (`with_timeout`) or
///   shared across several concurrent tasks (`with_deadline`)
///
/// # Example: Bootstrap a connection with a fixed backoff
///
/// ```rust,no_run
/// use resilience::{with_retry, RetryConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let config = RetryConfig::fixed(3, Duration::from_secs(5));
///
///     let connection = with_retry(config, || async {
///         // Open your connection here
///         Ok::<_, String>("connected")
///     })
///     .await;
/// }
/// ```
///
/// # Example: Database Query with Timeout
///
/// ```rust,no_run
/// use resilience::with_timeout;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let result = with_timeout(Duration::from_secs(3), async {
///         // Your database query
///         42
///     })
///     .await;
/// }
/// ```

pub mod retry;
pub mod timeout;

pub use retry::{with_retry, RetryConfig, RetryError};
pub use timeout::{with_deadline, with_timeout, TimeoutError};
