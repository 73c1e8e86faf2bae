//! In-memory provider simulation for tests.

use crate::error::{ProviderError, ProviderResult};
use crate::provider::ComputeProvider;
use crate::types::{IngressRule, InstanceDescriptor, InstanceState, LaunchSpec};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// [`ComputeProvider`] that keeps its whole control plane behind a mutex.
///
/// Simulates the parts of a real provider the controller must cope with:
/// instances boot `Pending` and only turn `Running` after a configurable
/// number of describe calls, duplicate security groups conflict, and
/// individual terminations can be made to fail.
pub struct InMemoryProvider {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: u32,
    ready_after: u32,
    fixed_dns: Option<String>,
    instances: HashMap<String, SimInstance>,
    launch_order: Vec<String>,
    terminated: Vec<String>,
    failing_terminations: Vec<String>,
    groups: HashMap<String, SimGroup>,
    deleted_groups: Vec<String>,
}

struct SimInstance {
    state: InstanceState,
    describes: u32,
    dns: String,
    image_id: String,
    tags: Vec<(String, String)>,
}

#[derive(Default)]
struct SimGroup {
    vpc_id: String,
    description: String,
    rules: Vec<IngressRule>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::with_readiness_after(1)
    }

    /// Instances stay `Pending` until described `polls` times.
    pub fn with_readiness_after(polls: u32) -> Self {
        InMemoryProvider {
            inner: Mutex::new(Inner {
                ready_after: polls,
                ..Inner::default()
            }),
        }
    }

    /// Publish every instance at the same address. Tests point this at a
    /// local stub server so the controller's HTTP clients have somewhere
    /// real to connect.
    pub fn with_fixed_dns(self, dns: impl Into<String>) -> Self {
        self.inner.lock().unwrap().fixed_dns = Some(dns.into());
        self
    }

    /// Make every `terminate_instance` call for `instance_id` fail.
    pub fn fail_termination_of(&self, instance_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_terminations
            .push(instance_id.to_string());
    }

    pub fn launch_count(&self) -> usize {
        self.inner.lock().unwrap().launch_order.len()
    }

    /// Instance ids in launch order.
    pub fn instance_ids(&self) -> Vec<String> {
        self.inner.lock().unwrap().launch_order.clone()
    }

    /// Ids successfully terminated, in termination order.
    pub fn terminated_ids(&self) -> Vec<String> {
        self.inner.lock().unwrap().terminated.clone()
    }

    /// Instances not yet terminated.
    pub fn live_instance_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .instances
            .values()
            .filter(|i| i.state != InstanceState::Terminated)
            .count()
    }

    pub fn group_names(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut names: Vec<String> = inner.groups.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn deleted_groups(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted_groups.clone()
    }

    pub fn tags_for(&self, instance_id: &str) -> Vec<(String, String)> {
        self.inner
            .lock()
            .unwrap()
            .instances
            .get(instance_id)
            .map(|i| i.tags.clone())
            .unwrap_or_default()
    }

    pub fn vpc_of_group(&self, name: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .groups
            .get(name)
            .map(|g| g.vpc_id.clone())
    }

    pub fn group_description(&self, name: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .groups
            .get(name)
            .map(|g| g.description.clone())
    }

    /// Image ids in launch order.
    pub fn launched_images(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .launch_order
            .iter()
            .filter_map(|id| inner.instances.get(id).map(|i| i.image_id.clone()))
            .collect()
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComputeProvider for InMemoryProvider {
    async fn run_instance(&self, spec: &LaunchSpec) -> ProviderResult<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("i-{:04}", inner.next_id);
        let dns = inner
            .fixed_dns
            .clone()
            .unwrap_or_else(|| format!("{id}.sim.internal"));
        inner.instances.insert(
            id.clone(),
            SimInstance {
                state: InstanceState::Pending,
                describes: 0,
                dns,
                image_id: spec.image_id.clone(),
                tags: Vec::new(),
            },
        );
        inner.launch_order.push(id.clone());
        Ok(id)
    }

    async fn describe_instance(&self, instance_id: &str) -> ProviderResult<InstanceDescriptor> {
        let mut inner = self.inner.lock().unwrap();
        let ready_after = inner.ready_after;
        let instance = inner
            .instances
            .get_mut(instance_id)
            .ok_or_else(|| ProviderError::NotFound(instance_id.to_string()))?;
        instance.describes += 1;
        if instance.state == InstanceState::Pending && instance.describes >= ready_after {
            instance.state = InstanceState::Running;
        }
        let public_dns =
            (instance.state == InstanceState::Running).then(|| instance.dns.clone());
        Ok(InstanceDescriptor {
            instance_id: instance_id.to_string(),
            state: instance.state,
            public_dns,
        })
    }

    async fn terminate_instance(&self, instance_id: &str) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_terminations.iter().any(|id| id == instance_id) {
            return Err(ProviderError::Api {
                status: 500,
                context: instance_id.to_string(),
                message: "injected termination failure".to_string(),
            });
        }
        let instance = inner
            .instances
            .get_mut(instance_id)
            .ok_or_else(|| ProviderError::NotFound(instance_id.to_string()))?;
        instance.state = InstanceState::Terminated;
        inner.terminated.push(instance_id.to_string());
        Ok(())
    }

    async fn tag_instance(
        &self,
        instance_id: &str,
        key: &str,
        value: &str,
    ) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let instance = inner
            .instances
            .get_mut(instance_id)
            .ok_or_else(|| ProviderError::NotFound(instance_id.to_string()))?;
        instance.tags.push((key.to_string(), value.to_string()));
        Ok(())
    }

    async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.groups.contains_key(name) {
            return Err(ProviderError::AlreadyExists(name.to_string()));
        }
        inner.groups.insert(
            name.to_string(),
            SimGroup {
                vpc_id: vpc_id.to_string(),
                description: description.to_string(),
                rules: Vec::new(),
            },
        );
        Ok(())
    }

    async fn authorize_ingress(&self, group: &str, rule: &IngressRule) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .groups
            .get_mut(group)
            .ok_or_else(|| ProviderError::NotFound(group.to_string()))?;
        if record.rules.contains(rule) {
            return Err(ProviderError::AlreadyExists(format!(
                "{group}: {}/{}-{}",
                rule.protocol, rule.from_port, rule.to_port
            )));
        }
        record.rules.push(rule.clone());
        Ok(())
    }

    async fn delete_security_group(&self, name: &str) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .groups
            .remove(name)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        inner.deleted_groups.push(name.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> LaunchSpec {
        LaunchSpec {
            image_id: "img-test".to_string(),
            instance_type: "t2.micro".to_string(),
            key_name: "key".to_string(),
            security_group: "sg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_instances_ramp_to_running() {
        let provider = InMemoryProvider::with_readiness_after(3);
        let id = provider.run_instance(&spec()).await.unwrap();
        assert_eq!(id, "i-0001");

        for _ in 0..2 {
            let desc = provider.describe_instance(&id).await.unwrap();
            assert_eq!(desc.state, InstanceState::Pending);
            assert!(desc.public_dns.is_none());
        }
        let desc = provider.describe_instance(&id).await.unwrap();
        assert_eq!(desc.state, InstanceState::Running);
        assert_eq!(desc.public_dns.as_deref(), Some("i-0001.sim.internal"));
    }

    #[tokio::test]
    async fn test_fixed_dns_applies_to_every_instance() {
        let provider = InMemoryProvider::new().with_fixed_dns("127.0.0.1:9999");
        let a = provider.run_instance(&spec()).await.unwrap();
        let b = provider.run_instance(&spec()).await.unwrap();
        for id in [a, b] {
            let desc = provider.describe_instance(&id).await.unwrap();
            assert_eq!(desc.public_dns.as_deref(), Some("127.0.0.1:9999"));
        }
    }

    #[tokio::test]
    async fn test_injected_termination_failure_keeps_instance_live() {
        let provider = InMemoryProvider::new();
        let id = provider.run_instance(&spec()).await.unwrap();
        provider.fail_termination_of(&id);

        let err = provider.terminate_instance(&id).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 500, .. }));
        assert_eq!(provider.live_instance_count(), 1);
        assert!(provider.terminated_ids().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_group_conflicts() {
        let provider = InMemoryProvider::new();
        provider
            .create_security_group("sg-a", "test group", "vpc-1")
            .await
            .unwrap();
        let err = provider
            .create_security_group("sg-a", "test group", "vpc-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists(_)));
        assert_eq!(provider.vpc_of_group("sg-a").as_deref(), Some("vpc-1"));
    }

    #[tokio::test]
    async fn test_duplicate_ingress_conflicts() {
        let provider = InMemoryProvider::new();
        provider
            .create_security_group("sg-a", "test group", "vpc-1")
            .await
            .unwrap();
        let rule = IngressRule::tcp_open(22, 80);
        provider.authorize_ingress("sg-a", &rule).await.unwrap();
        let err = provider.authorize_ingress("sg-a", &rule).await.unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let provider = InMemoryProvider::new();
        assert!(matches!(
            provider.describe_instance("i-9999").await.unwrap_err(),
            ProviderError::NotFound(_)
        ));
        assert!(matches!(
            provider.terminate_instance("i-9999").await.unwrap_err(),
            ProviderError::NotFound(_)
        ));
        assert!(matches!(
            provider.delete_security_group("sg-missing").await.unwrap_err(),
            ProviderError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_tags_are_recorded() {
        let provider = InMemoryProvider::new();
        let id = provider.run_instance(&spec()).await.unwrap();
        provider.tag_instance(&id, "Project", "2.1").await.unwrap();
        assert_eq!(
            provider.tags_for(&id),
            vec![("Project".to_string(), "2.1".to_string())]
        );
    }
}
