//! Security group bootstrap.

use crate::error::{ProviderError, ProviderResult};
use crate::provider::ComputeProvider;
use crate::types::IngressRule;
use tracing::{debug, info};

/// Desired state for one security group.
#[derive(Debug, Clone)]
pub struct SecurityGroupSpec {
    pub name: String,
    pub description: String,
    pub vpc_id: String,
    pub ingress: IngressRule,
}

impl SecurityGroupSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        vpc_id: impl Into<String>,
        ingress: IngressRule,
    ) -> Self {
        SecurityGroupSpec {
            name: name.into(),
            description: description.into(),
            vpc_id: vpc_id.into(),
            ingress,
        }
    }
}

/// Idempotent create-and-open. An existing group or an already-present rule
/// counts as success; any other failure propagates. Re-running an
/// experiment against leftover groups must not fail the bootstrap.
pub async fn ensure_security_group(
    provider: &dyn ComputeProvider,
    spec: &SecurityGroupSpec,
) -> ProviderResult<()> {
    match provider
        .create_security_group(&spec.name, &spec.description, &spec.vpc_id)
        .await
    {
        Ok(()) => info!(group = %spec.name, vpc = %spec.vpc_id, "security group created"),
        Err(ProviderError::AlreadyExists(_)) => {
            debug!(group = %spec.name, "security group already exists");
        }
        Err(e) => return Err(e),
    }

    match provider.authorize_ingress(&spec.name, &spec.ingress).await {
        Ok(()) => debug!(
            group = %spec.name,
            protocol = %spec.ingress.protocol,
            from = spec.ingress.from_port,
            to = spec.ingress.to_port,
            "ingress authorized"
        ),
        Err(ProviderError::AlreadyExists(_)) => {
            debug!(group = %spec.name, "ingress rule already present");
        }
        Err(e) => return Err(e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryProvider;

    fn group_spec() -> SecurityGroupSpec {
        SecurityGroupSpec::new(
            "service-security-group",
            "service instances",
            "vpc-1",
            IngressRule::tcp_open(22, 80),
        )
    }

    #[tokio::test]
    async fn test_ensure_creates_group_and_rule() {
        let provider = InMemoryProvider::new();
        ensure_security_group(&provider, &group_spec()).await.unwrap();
        assert_eq!(provider.group_names(), vec!["service-security-group"]);
        assert_eq!(
            provider.group_description("service-security-group").as_deref(),
            Some("service instances")
        );
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let provider = InMemoryProvider::new();
        ensure_security_group(&provider, &group_spec()).await.unwrap();
        ensure_security_group(&provider, &group_spec()).await.unwrap();
        assert_eq!(provider.group_names().len(), 1);
    }
}
