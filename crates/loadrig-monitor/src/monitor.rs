//! Periodic throughput log retrieval.

use crate::error::{MonitorError, MonitorResult};
use crate::sample::{MetricSample, parse_metrics};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fetches the generator's per-session throughput log, mirrors it to disk,
/// and parses it into a [`MetricSample`].
///
/// One monitor is bound to one test session; the log name is derived from
/// the session id the generator handed back when the test started.
pub struct LogMonitor {
    client: reqwest::Client,
    generator: String,
    session_id: String,
    snapshot_path: PathBuf,
}

impl LogMonitor {
    pub fn new(
        client: reqwest::Client,
        generator_address: impl Into<String>,
        session_id: impl Into<String>,
        data_dir: &Path,
    ) -> Self {
        let session_id = session_id.into();
        let snapshot_path = data_dir.join(format!("test.{session_id}.log"));
        LogMonitor {
            client,
            generator: generator_address.into(),
            session_id,
            snapshot_path,
        }
    }

    /// Name of the log file on the generator.
    pub fn log_name(&self) -> String {
        format!("test.{}.log", self.session_id)
    }

    /// Where the most recently fetched log body is mirrored.
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Fetch the current log, mirror it, and parse it. The mirror is
    /// written before parsing so a run that dies mid-loop still leaves the
    /// raw evidence on disk.
    pub async fn sample(&self) -> MonitorResult<MetricSample> {
        let url = format!("http://{}/log", self.generator);
        let resp = self
            .client
            .get(&url)
            .query(&[("name", self.log_name())])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MonitorError::Status {
                status: status.as_u16(),
                log: self.log_name(),
            });
        }
        let body = resp.text().await?;
        tokio::fs::write(&self.snapshot_path, &body)
            .await
            .map_err(|source| MonitorError::Snapshot {
                path: self.snapshot_path.clone(),
                source,
            })?;

        let sample = parse_metrics(&body);
        debug!(
            rps = sample.throughput,
            completed = sample.completed,
            log = %self.log_name(),
            "log sampled"
        );
        Ok(sample)
    }
}
