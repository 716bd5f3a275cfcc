use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Moderation submissions by kind and result (success/error).
    pub static ref MODERATION_SUBMISSIONS: IntCounterVec = register_int_counter_vec!(
        "moderation_submissions_total",
        "Moderation submissions segmented by kind and result",
        &["kind", "result"]
    )
    .expect("failed to register moderation_submissions_total");

    /// Verdicts applied by kind, verdict and outcome.
    pub static ref MODERATION_VERDICTS: IntCounterVec = register_int_counter_vec!(
        "moderation_verdicts_total",
        "Moderation verdicts segmented by kind, verdict and outcome",
        &["kind", "verdict", "outcome"]
    )
    .expect("failed to register moderation_verdicts_total");

    /// Which arm answered a single-record read (store/cache/none).
    pub static ref READ_SOURCE: IntCounterVec = register_int_counter_vec!(
        "content_read_source_total",
        "Single-record reads segmented by kind and answering source",
        &["kind", "source"]
    )
    .expect("failed to register content_read_source_total");

    /// Cache events (hit/miss/error/decode_error/write_error).
    pub static ref CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "content_cache_events_total",
        "Content cache events segmented by kind and event",
        &["kind", "event"]
    )
    .expect("failed to register content_cache_events_total");
}
