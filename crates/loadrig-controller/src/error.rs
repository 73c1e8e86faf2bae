//! Experiment error types.

use std::time::Duration;
use thiserror::Error;

pub type ExperimentResult<T> = Result<T, ExperimentError>;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("provider: {0}")]
    Provider(#[from] loadrig_provider::ProviderError),

    #[error("harness: {0}")]
    Harness(#[from] loadrig_harness::HarnessError),

    #[error("instance {instance_id} not ready after {waited:?}")]
    ReadyTimeout {
        instance_id: String,
        waited: Duration,
    },

    #[error("test session still running after {limit:?}")]
    SessionTimeout { limit: Duration },

    #[error("experiment cancelled")]
    Cancelled,
}
