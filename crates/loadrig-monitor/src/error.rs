//! Monitor error types.

use std::path::PathBuf;
use thiserror::Error;

pub type MonitorResult<T> = Result<T, MonitorError>;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// Transport failure fetching the log. Callers treat one bad poll as a
    /// skipped sample, not a failed experiment.
    #[error("log fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("log fetch for {log} returned status {status}")]
    Status { status: u16, log: String },

    #[error("failed to mirror log to {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
