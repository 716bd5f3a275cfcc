use super::pending_channel;
use crate::bus::ModerationTransport;
use crate::error::{AppError, Result};
use crate::metrics::content::MODERATION_SUBMISSIONS;
use crate::models::{Content, ModerationEnvelope};
use std::sync::Arc;
use tracing::{error, info, Instrument, Span};

/// Hands freshly stored items to the moderation authority.
///
/// Never retries: a failed submission surfaces as `Internal` to the caller.
pub struct ModerationSubmitter {
    transport: Arc<dyn ModerationTransport>,
    span: Span,
}

impl ModerationSubmitter {
    pub fn new(transport: Arc<dyn ModerationTransport>, span: Span) -> Self {
        Self { transport, span }
    }

    pub async fn submit<T: Content>(&self, item: &T) -> Result<()> {
        let kind = T::KIND.as_str();
        let result = self.publish_pending(item).instrument(self.span.clone()).await;

        MODERATION_SUBMISSIONS
            .with_label_values(&[kind, if result.is_ok() { "success" } else { "error" }])
            .inc();
        result
    }

    async fn publish_pending<T: Content>(&self, item: &T) -> Result<()> {
        let key = item.natural_key();
        let channel = pending_channel(T::KIND);

        let envelope = ModerationEnvelope::pending(item).map_err(|e| {
            error!(kind = %T::KIND, key = %key, error = %e, "Failed to encode moderation envelope");
            AppError::Internal("moderation submission failed".to_string())
        })?;
        let payload = envelope.to_bytes().map_err(|e| {
            error!(kind = %T::KIND, key = %key, error = %e, "Failed to serialize moderation envelope");
            AppError::Internal("moderation submission failed".to_string())
        })?;

        self.transport.publish(&channel, payload).await.map_err(|e| {
            error!(channel = %channel, key = %key, error = %e, "Failed to publish for moderation");
            AppError::Internal("moderation submission failed".to_string())
        })?;

        info!(
            channel = %channel,
            key = %key,
            message_id = ?envelope.message_id,
            "Submitted for moderation"
        );
        Ok(())
    }
}
