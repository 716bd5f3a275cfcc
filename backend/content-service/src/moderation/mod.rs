/// Moderation pipeline
///
/// - `submitter`: publishes freshly stored items to `pending.<kind>`
/// - `consumer`: applies verdicts from `approved.<kind>` / `rejected.<kind>`
/// - `ModerationPolicy`: which kinds go through review at all
use crate::models::{ContentKind, Verdict};
use std::collections::HashSet;

pub mod consumer;
pub mod submitter;

pub use consumer::{apply_verdict, VerdictConsumer, VerdictOutcome};
pub use submitter::ModerationSubmitter;

pub fn pending_channel(kind: ContentKind) -> String {
    format!("pending.{}", kind.as_str())
}

pub fn verdict_channel(verdict: Verdict, kind: ContentKind) -> String {
    format!("{}.{}", verdict.as_str(), kind.as_str())
}

/// Set of content kinds that require review before they are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationPolicy {
    reviewed: HashSet<ContentKind>,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self::new([ContentKind::News, ContentKind::Wallpaper])
    }
}

impl ModerationPolicy {
    pub fn new(kinds: impl IntoIterator<Item = ContentKind>) -> Self {
        Self {
            reviewed: kinds.into_iter().collect(),
        }
    }

    /// Parse a comma-separated kind list such as `news,wallpaper`.
    pub fn parse(list: &str) -> Result<Self, String> {
        let mut reviewed = HashSet::new();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let kind =
                ContentKind::parse(name).ok_or_else(|| format!("unknown content kind: {}", name))?;
            reviewed.insert(kind);
        }
        Ok(Self { reviewed })
    }

    pub fn requires_review(&self, kind: ContentKind) -> bool {
        self.reviewed.contains(&kind)
    }

    /// Reviewed kinds in a stable order.
    pub fn reviewed_kinds(&self) -> Vec<ContentKind> {
        ContentKind::ALL
            .into_iter()
            .filter(|kind| self.reviewed.contains(kind))
            .collect()
    }
}
