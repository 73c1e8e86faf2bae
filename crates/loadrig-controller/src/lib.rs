//! loadrig-controller — the experiment lifecycle.
//!
//! ```text
//!  bootstrapping → awaiting-ready → authenticating → test-running ⇄ scaling-up
//!        │               │                │               │
//!        └───────────────┴────────────────┴───────────────┴──→ tearing-down → done
//! ```
//!
//! Teardown is unconditional: however [`Experiment::run`] leaves the
//! driving phases (completion, failure, cancellation), every tracked
//! instance and security group is swept before the report is returned.

pub mod error;
pub mod experiment;
pub mod fleet;
pub mod session;

pub use error::{ExperimentError, ExperimentResult};
pub use experiment::{Experiment, ExperimentPhase, ExperimentReport, Outcome};
pub use fleet::{Fleet, Role, TeardownReport, TrackedInstance};
pub use session::{Completion, Decision, TestSession, decide};
