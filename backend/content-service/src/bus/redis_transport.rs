use super::{MessageHandler, ModerationTransport, TransportError};
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Redis pub/sub transport
///
/// Publishes through a shared connection manager. Every subscription gets its
/// own pub/sub connection and background task; messages on one channel are
/// handled one at a time.
pub struct RedisTransport {
    client: Client,
    publisher: ConnectionManager,
    subscriptions: Mutex<Vec<JoinHandle<()>>>,
}

impl RedisTransport {
    pub async fn connect(redis_url: &str) -> Result<Self, TransportError> {
        let client = Client::open(redis_url)?;
        let publisher = ConnectionManager::new(client.clone()).await?;

        Ok(Self {
            client,
            publisher,
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Stop every subscription task.
    pub async fn shutdown(&self) {
        let mut subscriptions = self.subscriptions.lock().await;
        for handle in subscriptions.drain(..) {
            handle.abort();
        }
        info!("Moderation transport subscriptions stopped");
    }
}

#[async_trait]
impl ModerationTransport for RedisTransport {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let mut conn = self.publisher.clone();
        let receivers: usize = conn.publish(channel, payload).await?;

        debug!(channel = %channel, receivers, "Message published");
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        handler: MessageHandler,
    ) -> Result<(), TransportError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;

        info!(channel = %channel, "Subscribed to moderation channel");

        let channel_name = channel.to_string();
        let handle = tokio::spawn(async move {
            let mut stream = pubsub.on_message();

            while let Some(msg) = stream.next().await {
                let payload = match msg.get_payload::<Vec<u8>>() {
                    Ok(p) => p,
                    Err(e) => {
                        error!(error = ?e, channel = %channel_name, "Failed to get message payload");
                        continue;
                    }
                };

                handler(payload).await;
            }

            warn!(channel = %channel_name, "Moderation subscription ended");
        });

        self.subscriptions.lock().await.push(handle);
        Ok(())
    }
}
