use super::{verdict_channel, ModerationPolicy};
use crate::bus::{MessageHandler, ModerationTransport, TransportError};
use crate::error::AppError;
use crate::metrics::content::MODERATION_VERDICTS;
use crate::models::{Content, ContentKind, ModerationEnvelope, Verdict};
use crate::services::{ContentService, ContentServices};
use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument, Span};

/// Result of applying one verdict message.
#[derive(Debug, Clone, PartialEq)]
pub enum VerdictOutcome {
    /// Approved item is in the store and cache
    Committed,
    /// Rejected item is gone from the store and cache
    RolledBack,
    /// Message was unusable and has been discarded
    Dropped(String),
    /// Content service rejected the change
    Failed(AppError),
}

impl VerdictOutcome {
    fn label(&self) -> &'static str {
        match self {
            VerdictOutcome::Committed => "committed",
            VerdictOutcome::RolledBack => "rolled_back",
            VerdictOutcome::Dropped(_) => "dropped",
            VerdictOutcome::Failed(_) => "failed",
        }
    }
}

/// Apply a raw verdict message for kind `T`.
///
/// Redelivery is harmless: an approval for an existing item and a rejection
/// for a missing one both succeed.
pub async fn apply_verdict<T: Content>(
    service: &ContentService<T>,
    verdict: Verdict,
    bytes: &[u8],
) -> VerdictOutcome {
    let envelope = match ModerationEnvelope::from_bytes(bytes) {
        Ok(envelope) => envelope,
        Err(e) => return VerdictOutcome::Dropped(format!("undecodable envelope: {}", e)),
    };

    if envelope.status != verdict.status() {
        return VerdictOutcome::Dropped(format!(
            "status {:?} on {} channel",
            envelope.status,
            verdict.as_str()
        ));
    }

    debug!(message_id = ?envelope.message_id, description = %envelope.description, "Applying verdict");

    match verdict {
        Verdict::Approved => {
            let item = match envelope.item::<T>() {
                Ok(item) => item,
                Err(e) => {
                    return VerdictOutcome::Dropped(format!("payload is not a {}: {}", T::KIND, e))
                }
            };
            match service.commit(item).await {
                Ok(()) => VerdictOutcome::Committed,
                Err(AppError::InvalidInput(reason)) => VerdictOutcome::Dropped(reason),
                Err(e) => VerdictOutcome::Failed(e),
            }
        }
        Verdict::Rejected => {
            let key = match envelope.key::<T>() {
                Some(key) => key,
                None => return VerdictOutcome::Dropped("payload carries no key fields".to_string()),
            };
            match service.rollback(&key).await {
                Ok(()) => VerdictOutcome::RolledBack,
                Err(AppError::InvalidInput(reason)) => VerdictOutcome::Dropped(reason),
                Err(e) => VerdictOutcome::Failed(e),
            }
        }
    }
}

async fn handle_verdict<T: Content>(service: &ContentService<T>, verdict: Verdict, bytes: &[u8]) {
    let outcome = apply_verdict(service, verdict, bytes).await;

    MODERATION_VERDICTS
        .with_label_values(&[T::KIND.as_str(), verdict.as_str(), outcome.label()])
        .inc();

    match &outcome {
        VerdictOutcome::Committed | VerdictOutcome::RolledBack => {
            info!(kind = %T::KIND, verdict = verdict.as_str(), outcome = outcome.label(), "Verdict applied");
        }
        VerdictOutcome::Dropped(reason) => {
            warn!(kind = %T::KIND, verdict = verdict.as_str(), reason = %reason, "Verdict message dropped");
        }
        VerdictOutcome::Failed(e) => {
            error!(kind = %T::KIND, verdict = verdict.as_str(), error = %e, "Failed to apply verdict");
        }
    }
}

fn verdict_handler<T: Content>(
    service: Arc<ContentService<T>>,
    verdict: Verdict,
    span: Span,
) -> MessageHandler {
    Arc::new(move |bytes: Vec<u8>| {
        let service = Arc::clone(&service);
        async move { handle_verdict(&service, verdict, &bytes).await }
            .instrument(span.clone())
            .boxed()
    })
}

/// Subscribes to the verdict channels of every reviewed kind.
pub struct VerdictConsumer {
    transport: Arc<dyn ModerationTransport>,
    services: ContentServices,
    policy: ModerationPolicy,
    span: Span,
}

impl VerdictConsumer {
    pub fn new(
        transport: Arc<dyn ModerationTransport>,
        services: ContentServices,
        policy: ModerationPolicy,
        span: Span,
    ) -> Self {
        Self {
            transport,
            services,
            policy,
            span,
        }
    }

    pub async fn start(&self) -> Result<(), TransportError> {
        for kind in self.policy.reviewed_kinds() {
            match kind {
                ContentKind::Article => self.subscribe_kind(&self.services.articles).await?,
                ContentKind::Meme => self.subscribe_kind(&self.services.memes).await?,
                ContentKind::Wallpaper => self.subscribe_kind(&self.services.wallpapers).await?,
                ContentKind::News => self.subscribe_kind(&self.services.news).await?,
            }
        }

        info!(
            kinds = ?self.policy.reviewed_kinds(),
            "Verdict consumer started"
        );
        Ok(())
    }

    async fn subscribe_kind<T: Content>(
        &self,
        service: &Arc<ContentService<T>>,
    ) -> Result<(), TransportError> {
        for verdict in [Verdict::Approved, Verdict::Rejected] {
            let channel = verdict_channel(verdict, T::KIND);
            let handler = verdict_handler(Arc::clone(service), verdict, self.span.clone());
            self.transport.subscribe(&channel, handler).await?;
        }
        Ok(())
    }
}
