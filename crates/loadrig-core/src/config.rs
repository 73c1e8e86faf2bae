//! loadrig.toml configuration schema.
//!
//! Every tunable of an experiment lives in one file which is read once at
//! startup and never mutated afterwards. Durations are written as strings
//! ("800ms", "100s", "5m") and parsed into [`Duration`] during
//! deserialization, so a malformed value fails the run before any instance
//! is launched.

use crate::duration::duration_str;
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    #[serde(default)]
    pub experiment: ExperimentConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub harness: HarnessConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Tunables of the scaling control loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Throughput level at which the experiment is declared complete.
    #[serde(default = "default_rps_target")]
    pub rps_target: f64,
    /// Minimum spacing between capacity decisions.
    #[serde(with = "duration_str", default = "default_cooldown")]
    pub cooldown: Duration,
    /// How often the throughput log is fetched while the test runs.
    #[serde(with = "duration_str", default = "default_poll_interval")]
    pub poll_interval: Duration,
    /// How often a booting instance is described while waiting for it.
    #[serde(with = "duration_str", default = "default_ready_poll_interval")]
    pub ready_poll_interval: Duration,
    /// Upper bound on how long a single instance may take to become ready.
    #[serde(with = "duration_str", default = "default_ready_timeout")]
    pub ready_timeout: Duration,
    /// Upper bound on the whole test session, readiness waits included.
    #[serde(with = "duration_str", default = "default_session_timeout")]
    pub session_timeout: Duration,
}

/// Where and how compute is provisioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provisioning API, e.g. `http://compute.internal:8700`.
    pub base_url: String,
    /// VPC the security groups are created in.
    pub vpc_id: String,
    /// Image booted for the load generator instance.
    pub load_generator_image: String,
    /// Image booted for every service instance.
    pub service_image: String,
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    /// SSH key pair attached to every instance.
    pub key_name: String,
    /// Value of the `Project` tag applied to every instance.
    #[serde(default = "default_project_tag")]
    pub project_tag: String,
    /// Security group for the load generator.
    #[serde(default = "default_generator_group")]
    pub generator_group: String,
    /// Security group shared by all service instances.
    #[serde(default = "default_service_group")]
    pub service_group: String,
}

/// Names of the environment variables holding harness credentials. The
/// values themselves never appear in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_username_env")]
    pub username_env: String,
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

/// Bounded retry schedule for transient harness failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent attempt.
    #[serde(with = "duration_str", default = "default_base_delay")]
    pub base_delay: Duration,
    /// Cap on the doubling backoff.
    #[serde(with = "duration_str", default = "default_max_delay")]
    pub max_delay: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory where fetched throughput logs are mirrored.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_rps_target() -> f64 {
    50.0
}

fn default_cooldown() -> Duration {
    Duration::from_secs(100)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_ready_poll_interval() -> Duration {
    Duration::from_millis(800)
}

fn default_ready_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(45 * 60)
}

fn default_instance_type() -> String {
    "t2.micro".to_string()
}

fn default_project_tag() -> String {
    "2.1".to_string()
}

fn default_generator_group() -> String {
    "lg-security-group".to_string()
}

fn default_service_group() -> String {
    "service-security-group".to_string()
}

fn default_username_env() -> String {
    "LOADRIG_USERNAME".to_string()
}

fn default_password_env() -> String {
    "LOADRIG_PASSWORD".to_string()
}

fn default_max_attempts() -> u32 {
    8
}

fn default_base_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            rps_target: default_rps_target(),
            cooldown: default_cooldown(),
            poll_interval: default_poll_interval(),
            ready_poll_interval: default_ready_poll_interval(),
            ready_timeout: default_ready_timeout(),
            session_timeout: default_session_timeout(),
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            username_env: default_username_env(),
            password_env: default_password_env(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            data_dir: default_data_dir(),
        }
    }
}

impl RigConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a config with placeholder provider settings filled in.
    pub fn scaffold() -> Self {
        RigConfig {
            experiment: ExperimentConfig::default(),
            provider: ProviderConfig {
                base_url: "http://localhost:8700".to_string(),
                vpc_id: "vpc-00000000".to_string(),
                load_generator_image: "img-loadgen".to_string(),
                service_image: "img-service".to_string(),
                instance_type: default_instance_type(),
                key_name: "loadrig".to_string(),
                project_tag: default_project_tag(),
                generator_group: default_generator_group(),
                service_group: default_service_group(),
            },
            harness: HarnessConfig::default(),
            retry: RetryConfig::default(),
            run: RunConfig::default(),
        }
    }
}
