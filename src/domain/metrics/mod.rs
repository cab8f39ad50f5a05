pub mod frame_record;
pub mod metrics_sink;
pub mod summary;

/// Target of the per-frame analytics events emitted through `tracing`.
pub const ANALYTICS_TARGET: &str = "analytics";
