/// Moderation message bus
///
/// A narrow publish/subscribe contract over named channels. Payloads are opaque
/// bytes; envelope encoding lives with the moderation components.
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

pub mod redis_transport;

pub use redis_transport::RedisTransport;

/// Async callback invoked once per inbound message, in arrival order.
pub type MessageHandler = Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ModerationTransport: Send + Sync {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Start delivering messages on `channel` to `handler`. Returns once the
    /// subscription is active.
    async fn subscribe(&self, channel: &str, handler: MessageHandler)
        -> Result<(), TransportError>;
}
