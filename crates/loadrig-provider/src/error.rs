//! Provider error taxonomy.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure talking to the provisioning API.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a status this client does not special-case.
    #[error("provider API error {status} on {context}: {message}")]
    Api {
        status: u16,
        context: String,
        message: String,
    },

    /// The referenced resource does not exist (yet).
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Creating something that is already there.
    #[error("resource already exists: {0}")]
    AlreadyExists(String),
}

impl ProviderError {
    /// Whether waiting and retrying can plausibly cure the failure.
    /// `NotFound` counts: a freshly launched instance may not be visible
    /// to describe calls for a few seconds.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Request(_)
                | ProviderError::NotFound(_)
                | ProviderError::Api {
                    status: 500..=599,
                    ..
                }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::NotFound("i-0001".to_string()).is_transient());
        assert!(
            ProviderError::Api {
                status: 503,
                context: "run_instance".to_string(),
                message: String::new(),
            }
            .is_transient()
        );
        assert!(
            !ProviderError::Api {
                status: 400,
                context: "run_instance".to_string(),
                message: String::new(),
            }
            .is_transient()
        );
        assert!(!ProviderError::AlreadyExists("sg".to_string()).is_transient());
    }
}
