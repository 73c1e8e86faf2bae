//! Resource ledger and the teardown sweep.

use loadrig_provider::{ComputeProvider, ProviderError};
use tracing::{info, warn};

/// What a tracked instance is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    LoadGenerator,
    ServiceNode,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::LoadGenerator => write!(f, "load-generator"),
            Role::ServiceNode => write!(f, "service-node"),
        }
    }
}

/// One provisioned instance the experiment is responsible for.
#[derive(Debug, Clone)]
pub struct TrackedInstance {
    pub id: String,
    pub role: Role,
}

/// Ledger of everything provisioned during a run.
///
/// An instance is tracked the moment its launch call returns, before it is
/// ready or tagged, so even a run that dies mid-bootstrap can sweep up
/// after itself.
#[derive(Debug, Default)]
pub struct Fleet {
    instances: Vec<TrackedInstance>,
    groups: Vec<String>,
}

impl Fleet {
    pub fn new() -> Self {
        Fleet::default()
    }

    pub fn track_instance(&mut self, id: impl Into<String>, role: Role) {
        self.instances.push(TrackedInstance {
            id: id.into(),
            role,
        });
    }

    pub fn track_group(&mut self, name: impl Into<String>) {
        self.groups.push(name.into());
    }

    /// Tracked instances in launch order.
    pub fn instances(&self) -> &[TrackedInstance] {
        &self.instances
    }

    pub fn service_count(&self) -> usize {
        self.instances
            .iter()
            .filter(|i| i.role == Role::ServiceNode)
            .count()
    }

    /// Terminate every instance, then delete every group. Each failure is
    /// logged and recorded but never stops the sweep; the report says what
    /// was left behind for a human to clean up.
    pub async fn teardown(&self, provider: &dyn ComputeProvider) -> TeardownReport {
        let mut report = TeardownReport::default();

        for instance in &self.instances {
            match provider.terminate_instance(&instance.id).await {
                Ok(()) => {
                    info!(id = %instance.id, role = %instance.role, "instance terminated");
                    report.terminated.push(instance.id.clone());
                }
                Err(e) => {
                    warn!(id = %instance.id, role = %instance.role, error = %e, "termination failed");
                    report.failed_instances.push((instance.id.clone(), e.to_string()));
                }
            }
        }

        for group in &self.groups {
            match provider.delete_security_group(group).await {
                Ok(()) => {
                    info!(%group, "security group deleted");
                    report.deleted_groups.push(group.clone());
                }
                Err(ProviderError::NotFound(_)) => {
                    info!(%group, "security group already gone");
                    report.deleted_groups.push(group.clone());
                }
                Err(e) => {
                    warn!(%group, error = %e, "security group deletion failed");
                    report.failed_groups.push((group.clone(), e.to_string()));
                }
            }
        }

        report
    }
}

/// What the teardown sweep achieved.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub terminated: Vec<String>,
    pub failed_instances: Vec<(String, String)>,
    pub deleted_groups: Vec<String>,
    pub failed_groups: Vec<(String, String)>,
}

impl TeardownReport {
    /// True when nothing was left behind.
    pub fn clean(&self) -> bool {
        self.failed_instances.is_empty() && self.failed_groups.is_empty()
    }
}
