//! Harness credentials, resolved from the environment at startup.

use crate::config::HarnessConfig;
use crate::error::{ConfigError, ConfigResult};

/// Username/password pair presented to the load generator before a test may
/// start.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Resolve credentials from the environment variables named in `config`.
    pub fn from_env(config: &HarnessConfig) -> ConfigResult<Self> {
        let username = std::env::var(&config.username_env)
            .map_err(|_| ConfigError::MissingEnv(config.username_env.clone()))?;
        let password = std::env::var(&config.password_env)
            .map_err(|_| ConfigError::MissingEnv(config.password_env.clone()))?;
        Ok(Credentials { username, password })
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
