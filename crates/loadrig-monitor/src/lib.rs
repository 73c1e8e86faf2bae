//! loadrig-monitor — throughput observation.
//!
//! The load generator exposes its per-session log over HTTP. [`LogMonitor`]
//! fetches it, mirrors the raw body to disk, and reduces it to a
//! [`MetricSample`] the scaling controller can act on.

pub mod error;
pub mod monitor;
pub mod sample;

pub use error::{MonitorError, MonitorResult};
pub use monitor::LogMonitor;
pub use sample::{MetricSample, parse_metrics};
