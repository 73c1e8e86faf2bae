//! loadrig-harness — test coordination against the load generator.
//!
//! The generator is controlled over four plain GET endpoints: present
//! credentials, start the test, add a backend, fetch the log. This crate
//! wraps the first three (the log lives in `loadrig-monitor`) behind a
//! bounded-retry client that knows which failures are worth retrying and
//! when an add-capacity attempt should be abandoned instead.

pub mod client;
pub mod error;
pub mod retry;

pub use client::{AddOutcome, HarnessClient};
pub use error::{HarnessError, HarnessResult};
pub use retry::RetryPolicy;
