//! Harness protocol errors.

use thiserror::Error;

pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Transport failure reaching the generator.
    #[error("harness request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status from the generator.
    #[error("harness returned status {status} during {operation}")]
    Status { status: u16, operation: &'static str },

    /// The generator answered, but not in the shape the protocol promises.
    /// Never retried: the response arrived fine, its content is what is
    /// wrong.
    #[error("harness protocol violation during {operation}: {detail}")]
    Protocol {
        operation: &'static str,
        detail: String,
    },

    /// Bounded retries ran out.
    #[error("{operation} still failing after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: Box<HarnessError>,
    },
}
