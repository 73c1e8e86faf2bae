//! loadrig-provider — the compute provisioning seam.
//!
//! The experiment controller only ever talks to a [`ComputeProvider`]. Two
//! implementations ship here: [`HttpProvider`] drives a JSON-over-HTTP
//! control plane, and [`InMemoryProvider`] simulates one for tests (boot
//! ramps, injected termination failures, duplicate-group conflicts).

pub mod error;
pub mod http;
pub mod memory;
pub mod provider;
pub mod setup;
pub mod types;

pub use error::{ProviderError, ProviderResult};
pub use http::HttpProvider;
pub use memory::InMemoryProvider;
pub use provider::ComputeProvider;
pub use setup::{SecurityGroupSpec, ensure_security_group};
pub use types::{IngressRule, InstanceDescriptor, InstanceState, LaunchSpec};
