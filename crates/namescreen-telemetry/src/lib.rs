//! namescreen telemetry
//!
//! Operational visibility for the detection pipeline.
//!
//! Provides:
//! - Per-tier detection counters mirrored into the `metrics` facade
//! - A JSON-lines request log for offline analysis

pub mod request_log;
pub mod stats;

pub use request_log::{RequestLog, RequestLogConfig, RequestRecord};
pub use stats::{DetectionStats, StatsSnapshot, TierShares};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::request_log::{RequestLog, RequestLogConfig, RequestRecord};
    pub use crate::stats::{DetectionStats, StatsSnapshot};
}
