//! loadrig-core — configuration and shared primitives for loadrig.
//!
//! Everything an experiment needs to know is read once from `loadrig.toml`
//! (plus two environment variables holding the harness credentials) into an
//! immutable [`RigConfig`] before any cloud resource is touched.

pub mod config;
pub mod credentials;
pub mod duration;
pub mod error;

pub use config::{
    ExperimentConfig, HarnessConfig, ProviderConfig, RetryConfig, RigConfig, RunConfig,
};
pub use credentials::Credentials;
pub use duration::{format_duration, parse_duration};
pub use error::{ConfigError, ConfigResult};
