//! HTTP client for the load generator's control endpoints.

use crate::error::{HarnessError, HarnessResult};
use crate::retry::RetryPolicy;
use loadrig_core::Credentials;
use loadrig_monitor::LogMonitor;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Pattern the generator embeds the per-session log name in when a test
/// starts, e.g. `test.1755866400.log`.
fn session_log_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"test\.([0-9]+)\.log").expect("static pattern"))
}

/// Extract the session id from a start-test response.
fn extract_session_id(body: &str) -> Option<String> {
    session_log_pattern()
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
}

/// What became of an add-capacity request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The generator acknowledged the new backend.
    Added,
    /// The test finished while the request was being retried; the backend
    /// was never joined and the experiment should wind down.
    Abandoned,
}

/// Client for the generator's control endpoints.
///
/// Every operation retries transport and status failures on the configured
/// [`RetryPolicy`]; protocol violations are surfaced immediately because a
/// retry would only replay the same malformed answer.
pub struct HarnessClient {
    client: reqwest::Client,
    generator: String,
    retry: RetryPolicy,
}

impl HarnessClient {
    pub fn new(
        client: reqwest::Client,
        generator_address: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        HarnessClient {
            client,
            generator: generator_address.into(),
            retry,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.generator, path)
    }

    async fn get_text(
        &self,
        operation: &'static str,
        path: &str,
        query: &[(&str, &str)],
    ) -> HarnessResult<String> {
        let resp = self.client.get(self.url(path)).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::Status {
                status: status.as_u16(),
                operation,
            });
        }
        Ok(resp.text().await?)
    }

    /// Present credentials. The generator refuses test control until this
    /// has succeeded once.
    pub async fn authenticate(&self, credentials: &Credentials) -> HarnessResult<()> {
        let query = [
            ("passwd", credentials.password.as_str()),
            ("username", credentials.username.as_str()),
        ];
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.get_text("authenticate", "/password", &query).await {
                Ok(body) => {
                    debug!(response = %body.trim(), "credentials accepted");
                    return Ok(());
                }
                Err(e) if self.retry.allows(attempt) => {
                    warn!(attempt, error = %e, "authentication failed; retrying");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                }
                Err(e) => {
                    return Err(HarnessError::RetriesExhausted {
                        operation: "authenticate",
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
            }
        }
    }

    /// Start the load test against the first service backend. Returns the
    /// session id parsed out of the generator's response; a response with
    /// no recognizable log name is a protocol violation, not a retry case.
    pub async fn start_test(&self, service_address: &str) -> HarnessResult<String> {
        let query = [("dns", service_address)];
        let mut attempt = 0;
        let body = loop {
            attempt += 1;
            match self.get_text("start_test", "/test/horizontal", &query).await {
                Ok(body) => break body,
                Err(e) if self.retry.allows(attempt) => {
                    warn!(attempt, error = %e, "start test failed; retrying");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                }
                Err(e) => {
                    return Err(HarnessError::RetriesExhausted {
                        operation: "start_test",
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
            }
        };
        let session_id = extract_session_id(&body).ok_or_else(|| HarnessError::Protocol {
            operation: "start_test",
            detail: format!("no session log name in response {:?}", body.trim()),
        })?;
        info!(%session_id, backend = %service_address, "load test started");
        Ok(session_id)
    }

    /// Point the generator at one more service backend.
    ///
    /// Between failed attempts the throughput log is consulted: once the
    /// finished marker is up there is nobody left to add capacity for, and
    /// the attempt is abandoned instead of escalated.
    pub async fn add_capacity(
        &self,
        service_address: &str,
        monitor: &LogMonitor,
    ) -> HarnessResult<AddOutcome> {
        let query = [("dns", service_address)];
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .get_text("add_capacity", "/test/horizontal/add", &query)
                .await
            {
                Ok(body) => {
                    info!(backend = %service_address, response = %body.trim(), "backend added");
                    return Ok(AddOutcome::Added);
                }
                Err(e) if self.retry.allows(attempt) => {
                    warn!(attempt, error = %e, "add capacity failed; retrying");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    match monitor.sample().await {
                        Ok(sample) if sample.completed => {
                            info!(backend = %service_address, "test finished mid-retry; abandoning add");
                            return Ok(AddOutcome::Abandoned);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            debug!(error = %e, "completion re-check failed; retries continue");
                        }
                    }
                }
                Err(e) => {
                    return Err(HarnessError::RetriesExhausted {
                        operation: "add_capacity",
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_extracted_from_log_name() {
        let body = "Test started. Writing log to test.1755866400.log on the generator.";
        assert_eq!(extract_session_id(body).as_deref(), Some("1755866400"));
    }

    #[test]
    fn test_first_log_name_wins() {
        let body = "test.11.log then test.22.log";
        assert_eq!(extract_session_id(body).as_deref(), Some("11"));
    }

    #[test]
    fn test_missing_or_empty_id_is_rejected() {
        assert_eq!(extract_session_id("Test started."), None);
        assert_eq!(extract_session_id("writing to test..log"), None);
        assert_eq!(extract_session_id("writing to test.abc.log"), None);
    }
}
