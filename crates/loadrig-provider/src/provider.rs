//! The compute provider seam.

use crate::error::ProviderResult;
use crate::types::{IngressRule, InstanceDescriptor, LaunchSpec};
use async_trait::async_trait;

/// Operations loadrig needs from an IaaS control plane.
///
/// Implementations must be shareable across tasks; the controller holds one
/// behind an `Arc` and calls it from both the experiment loop and teardown.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Boot one instance and return its id. The instance is usually still
    /// `Pending` when this returns.
    async fn run_instance(&self, spec: &LaunchSpec) -> ProviderResult<String>;

    /// Current state of an instance. May return
    /// [`NotFound`](crate::ProviderError::NotFound) shortly after launch
    /// while the control plane catches up; callers poll rather than fail.
    async fn describe_instance(&self, instance_id: &str) -> ProviderResult<InstanceDescriptor>;

    async fn terminate_instance(&self, instance_id: &str) -> ProviderResult<()>;

    async fn tag_instance(&self, instance_id: &str, key: &str, value: &str)
    -> ProviderResult<()>;

    /// Create a security group. Returns
    /// [`AlreadyExists`](crate::ProviderError::AlreadyExists) if the name is
    /// taken.
    async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> ProviderResult<()>;

    async fn authorize_ingress(&self, group: &str, rule: &IngressRule) -> ProviderResult<()>;

    async fn delete_security_group(&self, name: &str) -> ProviderResult<()>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
