/// Moderation wire envelope
///
/// Exists only on the bus: the submitter publishes `pending` envelopes and the
/// moderation authority answers on the `approved` and `rejected` channels.
use super::{Content, NaturalKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

/// The decision carried by a verdict channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected,
}

impl Verdict {
    pub fn status(self) -> ModerationStatus {
        match self {
            Verdict::Approved => ModerationStatus::Approved,
            Verdict::Rejected => ModerationStatus::Rejected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    pub status: ModerationStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    /// Full item for pending/approved, at least the key fields for rejected
    pub payload: Value,
}

impl ModerationEnvelope {
    pub fn new(status: ModerationStatus, description: impl Into<String>, payload: Value) -> Self {
        Self {
            message_id: Some(Uuid::new_v4()),
            status,
            timestamp: Utc::now(),
            description: description.into(),
            payload,
        }
    }

    /// Pending submission for a freshly stored item.
    pub fn pending<T: Content>(item: &T) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_value(item)?;
        Ok(Self::new(
            ModerationStatus::Pending,
            format!("{} submitted for review", T::KIND),
            payload,
        ))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Decode the payload as a full item of kind `T`.
    pub fn item<T: Content>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    /// Key fields of `T` carried in the payload.
    pub fn key<T: Content>(&self) -> Option<NaturalKey> {
        NaturalKey::from_payload::<T>(&self.payload)
    }
}
