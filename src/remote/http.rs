//! reqwest-backed client for the Atlas admin API.

use super::types::{
    AtlasAlertConfig, AtlasAssignedTeam, AtlasCloudProviderRole, AtlasContainer, AtlasCustomRole,
    AtlasIntegration, AtlasPeer, AtlasTeam, CloudProviderAccessRoles, Page,
};
use super::{
    AlertConfigurationsApi, CloudProviderAccessApi, CustomRolesApi, IntegrationsApi,
    NetworkPeeringApi, RemoteError, TeamsApi,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const API_PREFIX: [&str; 3] = ["api", "atlas", "v2"];

/// HTTP client for every family API.
///
/// - Bearer token authentication
/// - Per-request timeout
/// - Paged listing via `pageNum` / `itemsPerPage` / `totalCount`
pub struct AtlasClient {
    base_url: Url,
    token: String,
    timeout: Duration,
    items_per_page: u32,
    client: Arc<Client>,
}

impl AtlasClient {
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
        items_per_page: u32,
        client: Arc<Client>,
    ) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::Transport(format!("invalid base url '{}': {}", base_url, e)))?;
        Ok(Self {
            base_url,
            token: token.into(),
            timeout,
            items_per_page: items_per_page.max(1),
            client,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Transport(format!("base url '{}' cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    fn group_url(&self, project_id: &str, rest: &[&str]) -> Result<Url, RemoteError> {
        let mut segments = vec!["groups", project_id];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("authorization", format!("Bearer {}", self.token))
            .header("accept", "application/json")
            .timeout(self.timeout)
    }

    fn transport_error(&self, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout(self.timeout.as_millis() as u64)
        } else {
            RemoteError::Transport(e.to_string())
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());
        Err(RemoteError::api(status.as_u16(), detail))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = self.execute(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Decode(format!("failed to read response body: {}", e)))?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), RemoteError> {
        self.execute(request).await.map(|_| ())
    }

    /// Follow `pageNum` until `totalCount` items (or a short page) arrive.
    async fn list_all<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, RemoteError> {
        let mut items = Vec::new();
        let per_page = self.items_per_page.to_string();
        let mut page_num: u32 = 1;

        loop {
            let page_str = page_num.to_string();
            let request = self
                .client
                .get(url.clone())
                .query(query)
                .query(&[("pageNum", page_str.as_str()), ("itemsPerPage", per_page.as_str())]);
            let page: Page<T> = self.send_json(request).await?;

            let received = page.results.len();
            items.extend(page.results);

            let done = match page.total_count {
                Some(total) => items.len() as u64 >= total || received == 0,
                None => received < self.items_per_page as usize,
            };
            if done {
                return Ok(items);
            }
            page_num += 1;
        }
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, RemoteError> {
        self.send_json(self.client.post(url).json(body)).await
    }

    async fn delete(&self, url: Url) -> Result<(), RemoteError> {
        self.send_empty(self.client.delete(url)).await
    }
}

#[async_trait]
impl CustomRolesApi for AtlasClient {
    async fn list_custom_roles(&self, project_id: &str) -> Result<Vec<AtlasCustomRole>, RemoteError> {
        let url = self.group_url(project_id, &["customDBRoles", "roles"])?;
        self.send_json(self.client.get(url)).await
    }

    async fn create_custom_role(
        &self,
        project_id: &str,
        role: &AtlasCustomRole,
    ) -> Result<AtlasCustomRole, RemoteError> {
        let url = self.group_url(project_id, &["customDBRoles", "roles"])?;
        self.post(url, role).await
    }

    async fn update_custom_role(
        &self,
        project_id: &str,
        role_name: &str,
        role: &AtlasCustomRole,
    ) -> Result<AtlasCustomRole, RemoteError> {
        let url = self.group_url(project_id, &["customDBRoles", "roles", role_name])?;
        self.send_json(self.client.patch(url).json(role)).await
    }

    async fn delete_custom_role(&self, project_id: &str, role_name: &str) -> Result<(), RemoteError> {
        let url = self.group_url(project_id, &["customDBRoles", "roles", role_name])?;
        self.delete(url).await
    }
}

#[async_trait]
impl NetworkPeeringApi for AtlasClient {
    async fn list_peers(
        &self,
        project_id: &str,
        provider: Option<&str>,
    ) -> Result<Vec<AtlasPeer>, RemoteError> {
        let url = self.group_url(project_id, &["peers"])?;
        match provider {
            Some(p) => self.list_all(url, &[("providerName", p)]).await,
            None => self.list_all(url, &[]).await,
        }
    }

    async fn create_peer(&self, project_id: &str, peer: &AtlasPeer) -> Result<AtlasPeer, RemoteError> {
        let url = self.group_url(project_id, &["peers"])?;
        self.post(url, peer).await
    }

    async fn delete_peer(&self, project_id: &str, peer_id: &str) -> Result<(), RemoteError> {
        let url = self.group_url(project_id, &["peers", peer_id])?;
        self.delete(url).await
    }

    async fn list_containers(
        &self,
        project_id: &str,
        provider: Option<&str>,
    ) -> Result<Vec<AtlasContainer>, RemoteError> {
        match provider {
            Some(p) => {
                let url = self.group_url(project_id, &["containers"])?;
                self.list_all(url, &[("providerName", p)]).await
            }
            None => {
                let url = self.group_url(project_id, &["containers", "all"])?;
                self.list_all(url, &[]).await
            }
        }
    }

    async fn get_container(
        &self,
        project_id: &str,
        container_id: &str,
    ) -> Result<AtlasContainer, RemoteError> {
        let url = self.group_url(project_id, &["containers", container_id])?;
        self.send_json(self.client.get(url)).await
    }

    async fn create_container(
        &self,
        project_id: &str,
        container: &AtlasContainer,
    ) -> Result<AtlasContainer, RemoteError> {
        let url = self.group_url(project_id, &["containers"])?;
        self.post(url, container).await
    }

    async fn delete_container(&self, project_id: &str, container_id: &str) -> Result<(), RemoteError> {
        let url = self.group_url(project_id, &["containers", container_id])?;
        self.delete(url).await
    }
}

#[async_trait]
impl CloudProviderAccessApi for AtlasClient {
    async fn list_cloud_provider_roles(
        &self,
        project_id: &str,
    ) -> Result<Vec<AtlasCloudProviderRole>, RemoteError> {
        let url = self.group_url(project_id, &["cloudProviderAccess"])?;
        let roles: CloudProviderAccessRoles = self.send_json(self.client.get(url)).await?;
        Ok(roles.aws_iam_roles)
    }

    async fn create_cloud_provider_role(
        &self,
        project_id: &str,
        provider_name: &str,
    ) -> Result<AtlasCloudProviderRole, RemoteError> {
        let url = self.group_url(project_id, &["cloudProviderAccess"])?;
        let body = AtlasCloudProviderRole {
            provider_name: provider_name.to_string(),
            ..Default::default()
        };
        self.post(url, &body).await
    }

    async fn authorize_cloud_provider_role(
        &self,
        project_id: &str,
        role_id: &str,
        role: &AtlasCloudProviderRole,
    ) -> Result<AtlasCloudProviderRole, RemoteError> {
        let url = self.group_url(project_id, &["cloudProviderAccess", role_id])?;
        self.send_json(self.client.patch(url).json(role)).await
    }

    async fn deauthorize_cloud_provider_role(
        &self,
        project_id: &str,
        provider_name: &str,
        role_id: &str,
    ) -> Result<(), RemoteError> {
        let url = self.group_url(project_id, &["cloudProviderAccess", provider_name, role_id])?;
        self.delete(url).await
    }
}

#[async_trait]
impl AlertConfigurationsApi for AtlasClient {
    async fn list_alert_configs(&self, project_id: &str) -> Result<Vec<AtlasAlertConfig>, RemoteError> {
        let url = self.group_url(project_id, &["alertConfigs"])?;
        self.list_all(url, &[]).await
    }

    async fn create_alert_config(
        &self,
        project_id: &str,
        config: &AtlasAlertConfig,
    ) -> Result<AtlasAlertConfig, RemoteError> {
        let url = self.group_url(project_id, &["alertConfigs"])?;
        self.post(url, config).await
    }

    async fn delete_alert_config(&self, project_id: &str, config_id: &str) -> Result<(), RemoteError> {
        let url = self.group_url(project_id, &["alertConfigs", config_id])?;
        self.delete(url).await
    }
}

#[async_trait]
impl IntegrationsApi for AtlasClient {
    async fn list_integrations(&self, project_id: &str) -> Result<Vec<AtlasIntegration>, RemoteError> {
        let url = self.group_url(project_id, &["integrations"])?;
        self.list_all(url, &[]).await
    }

    async fn create_integration(
        &self,
        project_id: &str,
        integration: &AtlasIntegration,
    ) -> Result<(), RemoteError> {
        let url = self.group_url(project_id, &["integrations", &integration.integration_type])?;
        self.send_empty(self.client.post(url).json(integration)).await
    }

    async fn replace_integration(
        &self,
        project_id: &str,
        integration: &AtlasIntegration,
    ) -> Result<(), RemoteError> {
        let url = self.group_url(project_id, &["integrations", &integration.integration_type])?;
        self.send_empty(self.client.put(url).json(integration)).await
    }

    async fn delete_integration(&self, project_id: &str, integration_type: &str) -> Result<(), RemoteError> {
        let url = self.group_url(project_id, &["integrations", integration_type])?;
        self.delete(url).await
    }

    fn prometheus_discovery_url(&self, project_id: &str) -> Option<String> {
        let host = self.base_url.host_str()?;
        Some(format!(
            "https://{}/prometheus/v1.0/groups/{}/discovery",
            host, project_id
        ))
    }
}

#[async_trait]
impl TeamsApi for AtlasClient {
    async fn list_assigned_teams(&self, project_id: &str) -> Result<Vec<AtlasAssignedTeam>, RemoteError> {
        let url = self.group_url(project_id, &["teams"])?;
        self.list_all(url, &[]).await
    }

    async fn add_teams(&self, project_id: &str, teams: &[AtlasAssignedTeam]) -> Result<(), RemoteError> {
        let url = self.group_url(project_id, &["teams"])?;
        self.send_empty(self.client.post(url).json(teams)).await
    }

    async fn remove_team(&self, project_id: &str, team_id: &str) -> Result<(), RemoteError> {
        let url = self.group_url(project_id, &["teams", team_id])?;
        self.delete(url).await
    }

    async fn get_team_by_name(&self, org_id: &str, team_name: &str) -> Result<AtlasTeam, RemoteError> {
        let url = self.url(&["orgs", org_id, "teams", "byName", team_name])?;
        self.send_json(self.client.get(url)).await
    }
}
