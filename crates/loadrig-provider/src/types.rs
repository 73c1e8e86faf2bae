//! Domain types shared by every provider implementation.

use serde::{Deserialize, Serialize};

/// Parameters for booting one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub image_id: String,
    pub instance_type: String,
    pub key_name: String,
    pub security_group: String,
}

/// Provider-reported lifecycle state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    /// Any state this client does not model.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceState::Pending => write!(f, "pending"),
            InstanceState::Running => write!(f, "running"),
            InstanceState::ShuttingDown => write!(f, "shutting-down"),
            InstanceState::Terminated => write!(f, "terminated"),
            InstanceState::Unknown => write!(f, "unknown"),
        }
    }
}

/// One instance as reported by
/// [`describe_instance`](crate::ComputeProvider::describe_instance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    pub instance_id: String,
    pub state: InstanceState,
    /// Public address, present once the instance is reachable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_dns: Option<String>,
}

impl InstanceDescriptor {
    /// Address to drive traffic at. `None` until the instance is running
    /// and an address has been published.
    pub fn ready_address(&self) -> Option<&str> {
        if self.state != InstanceState::Running {
            return None;
        }
        self.public_dns.as_deref().filter(|dns| !dns.is_empty())
    }
}

/// One ingress permission on a security group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    pub cidr: String,
}

impl IngressRule {
    /// TCP from anywhere over an inclusive port range.
    pub fn tcp_open(from_port: u16, to_port: u16) -> Self {
        IngressRule {
            protocol: "tcp".to_string(),
            from_port,
            to_port,
            cidr: "0.0.0.0/0".to_string(),
        }
    }
}
