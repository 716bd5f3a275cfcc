/// Content Service Library
///
/// Stores and serves moderated content (articles, memes, wallpapers, news).
/// Writes go to Postgres first and are mirrored into Redis; reviewed kinds are
/// handed to an external moderation authority over a Redis pub/sub bus and its
/// verdicts are applied asynchronously. Single-record reads race the cache
/// against the store.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers
/// - `models`: Content kinds, field schema, filters, moderation envelope
/// - `services`: Content service and the store/cache read race
/// - `moderation`: Submitter, verdict consumer, review policy
/// - `db`: Repository contract and Postgres implementation
/// - `cache`: Cache contract and Redis implementation
/// - `bus`: Publish/subscribe transport
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Observability and metrics collection
pub mod bus;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod moderation;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
