//! REST client for the provisioning control plane.

use crate::error::{ProviderError, ProviderResult};
use crate::provider::ComputeProvider;
use crate::types::{IngressRule, InstanceDescriptor, LaunchSpec};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// [`ComputeProvider`] backed by a JSON-over-HTTP control plane.
///
/// Endpoints:
/// - `POST /v1/instances` boots an instance
/// - `GET /v1/instances/{id}` describes it
/// - `DELETE /v1/instances/{id}` terminates it
/// - `POST /v1/instances/{id}/tags` attaches a tag
/// - `POST /v1/security-groups` creates a group (409 when it exists)
/// - `POST /v1/security-groups/{name}/ingress` opens a rule (409 when present)
/// - `DELETE /v1/security-groups/{name}` removes a group
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct RunInstanceRequest<'a> {
    image_id: &'a str,
    instance_type: &'a str,
    key_name: &'a str,
    security_group: &'a str,
}

#[derive(Deserialize)]
struct RunInstanceResponse {
    instance_id: String,
}

#[derive(Serialize)]
struct TagRequest<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct CreateGroupRequest<'a> {
    name: &'a str,
    description: &'a str,
    vpc_id: &'a str,
}

impl HttpProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpProvider {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Use an externally configured client (timeouts, proxies).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        HttpProvider {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Map non-success statuses onto the error taxonomy. 404 and 409 carry
    /// meaning (resource absent, resource duplicated); everything else is a
    /// plain API error.
    async fn check(resp: Response, context: &str) -> ProviderResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(ProviderError::NotFound(context.to_string())),
            StatusCode::CONFLICT => Err(ProviderError::AlreadyExists(context.to_string())),
            _ => Err(ProviderError::Api {
                status: status.as_u16(),
                context: context.to_string(),
                message,
            }),
        }
    }
}

#[async_trait]
impl ComputeProvider for HttpProvider {
    async fn run_instance(&self, spec: &LaunchSpec) -> ProviderResult<String> {
        let body = RunInstanceRequest {
            image_id: &spec.image_id,
            instance_type: &spec.instance_type,
            key_name: &spec.key_name,
            security_group: &spec.security_group,
        };
        let resp = self
            .client
            .post(self.url("/v1/instances"))
            .json(&body)
            .send()
            .await?;
        let resp = Self::check(resp, "run_instance").await?;
        let parsed: RunInstanceResponse = resp.json().await?;
        debug!(instance_id = %parsed.instance_id, image = %spec.image_id, "instance requested");
        Ok(parsed.instance_id)
    }

    async fn describe_instance(&self, instance_id: &str) -> ProviderResult<InstanceDescriptor> {
        let resp = self
            .client
            .get(self.url(&format!("/v1/instances/{instance_id}")))
            .send()
            .await?;
        let resp = Self::check(resp, instance_id).await?;
        Ok(resp.json().await?)
    }

    async fn terminate_instance(&self, instance_id: &str) -> ProviderResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/v1/instances/{instance_id}")))
            .send()
            .await?;
        Self::check(resp, instance_id).await?;
        debug!(%instance_id, "termination requested");
        Ok(())
    }

    async fn tag_instance(
        &self,
        instance_id: &str,
        key: &str,
        value: &str,
    ) -> ProviderResult<()> {
        let body = TagRequest { key, value };
        let resp = self
            .client
            .post(self.url(&format!("/v1/instances/{instance_id}/tags")))
            .json(&body)
            .send()
            .await?;
        Self::check(resp, instance_id).await?;
        Ok(())
    }

    async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> ProviderResult<()> {
        let body = CreateGroupRequest {
            name,
            description,
            vpc_id,
        };
        let resp = self
            .client
            .post(self.url("/v1/security-groups"))
            .json(&body)
            .send()
            .await?;
        Self::check(resp, name).await?;
        debug!(group = %name, %vpc_id, "security group created");
        Ok(())
    }

    async fn authorize_ingress(&self, group: &str, rule: &IngressRule) -> ProviderResult<()> {
        let resp = self
            .client
            .post(self.url(&format!("/v1/security-groups/{group}/ingress")))
            .json(rule)
            .send()
            .await?;
        Self::check(resp, group).await?;
        Ok(())
    }

    async fn delete_security_group(&self, name: &str) -> ProviderResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/v1/security-groups/{name}")))
            .send()
            .await?;
        Self::check(resp, name).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let provider = HttpProvider::new("http://compute.internal:8700/");
        assert_eq!(
            provider.url("/v1/instances"),
            "http://compute.internal:8700/v1/instances"
        );
        let provider = HttpProvider::new("http://compute.internal:8700");
        assert_eq!(
            provider.url("/v1/instances/i-1"),
            "http://compute.internal:8700/v1/instances/i-1"
        );
    }
}
