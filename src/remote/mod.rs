//! Remote control-plane API abstraction.
//!
//! One narrow async trait per resource family. Families only see the trait
//! they need; the pass context carries them all through [`AtlasApi`].
//!
//! # Object Safety
//!
//! Every trait is object-safe and used as `Arc<dyn AtlasApi>`, so methods go
//! through `async_trait`.
//!
//! # Status codes
//!
//! Non-2xx answers come back as [`RemoteError::Api`] with the status kept;
//! callers treat 404 and 409 as meaningful (see [`RemoteError::is_not_found`]).

use async_trait::async_trait;

pub mod error;
pub mod http;
pub mod types;

pub use error::RemoteError;
pub use http::AtlasClient;
pub use types::{
    AtlasAction, AtlasAlertConfig, AtlasAssignedTeam, AtlasCloudProviderRole, AtlasContainer,
    AtlasCustomRole, AtlasInheritedRole, AtlasIntegration, AtlasMetricThreshold,
    AtlasNotification, AtlasPeer, AtlasResource, AtlasTeam, AtlasThreshold, Page,
};

#[async_trait]
pub trait CustomRolesApi: Send + Sync {
    async fn list_custom_roles(&self, project_id: &str)
        -> Result<Vec<AtlasCustomRole>, RemoteError>;

    async fn create_custom_role(
        &self,
        project_id: &str,
        role: &AtlasCustomRole,
    ) -> Result<AtlasCustomRole, RemoteError>;

    /// The body must not carry the role name; the remote rejects it on update.
    async fn update_custom_role(
        &self,
        project_id: &str,
        role_name: &str,
        role: &AtlasCustomRole,
    ) -> Result<AtlasCustomRole, RemoteError>;

    async fn delete_custom_role(&self, project_id: &str, role_name: &str)
        -> Result<(), RemoteError>;
}

#[async_trait]
pub trait NetworkPeeringApi: Send + Sync {
    /// Peers for one provider; `None` lists the default (AWS) view.
    async fn list_peers(
        &self,
        project_id: &str,
        provider: Option<&str>,
    ) -> Result<Vec<AtlasPeer>, RemoteError>;

    async fn create_peer(&self, project_id: &str, peer: &AtlasPeer)
        -> Result<AtlasPeer, RemoteError>;

    async fn delete_peer(&self, project_id: &str, peer_id: &str) -> Result<(), RemoteError>;

    async fn list_containers(
        &self,
        project_id: &str,
        provider: Option<&str>,
    ) -> Result<Vec<AtlasContainer>, RemoteError>;

    async fn get_container(
        &self,
        project_id: &str,
        container_id: &str,
    ) -> Result<AtlasContainer, RemoteError>;

    async fn create_container(
        &self,
        project_id: &str,
        container: &AtlasContainer,
    ) -> Result<AtlasContainer, RemoteError>;

    async fn delete_container(&self, project_id: &str, container_id: &str)
        -> Result<(), RemoteError>;
}

#[async_trait]
pub trait CloudProviderAccessApi: Send + Sync {
    async fn list_cloud_provider_roles(
        &self,
        project_id: &str,
    ) -> Result<Vec<AtlasCloudProviderRole>, RemoteError>;

    /// Starts a new, not yet authorized role (no assumed role ARN).
    async fn create_cloud_provider_role(
        &self,
        project_id: &str,
        provider_name: &str,
    ) -> Result<AtlasCloudProviderRole, RemoteError>;

    async fn authorize_cloud_provider_role(
        &self,
        project_id: &str,
        role_id: &str,
        role: &AtlasCloudProviderRole,
    ) -> Result<AtlasCloudProviderRole, RemoteError>;

    async fn deauthorize_cloud_provider_role(
        &self,
        project_id: &str,
        provider_name: &str,
        role_id: &str,
    ) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait AlertConfigurationsApi: Send + Sync {
    async fn list_alert_configs(
        &self,
        project_id: &str,
    ) -> Result<Vec<AtlasAlertConfig>, RemoteError>;

    async fn create_alert_config(
        &self,
        project_id: &str,
        config: &AtlasAlertConfig,
    ) -> Result<AtlasAlertConfig, RemoteError>;

    async fn delete_alert_config(&self, project_id: &str, config_id: &str)
        -> Result<(), RemoteError>;
}

#[async_trait]
pub trait IntegrationsApi: Send + Sync {
    async fn list_integrations(
        &self,
        project_id: &str,
    ) -> Result<Vec<AtlasIntegration>, RemoteError>;

    async fn create_integration(
        &self,
        project_id: &str,
        integration: &AtlasIntegration,
    ) -> Result<(), RemoteError>;

    async fn replace_integration(
        &self,
        project_id: &str,
        integration: &AtlasIntegration,
    ) -> Result<(), RemoteError>;

    async fn delete_integration(
        &self,
        project_id: &str,
        integration_type: &str,
    ) -> Result<(), RemoteError>;

    /// Scrape discovery endpoint for a project's Prometheus integration.
    fn prometheus_discovery_url(&self, _project_id: &str) -> Option<String> {
        None
    }
}

#[async_trait]
pub trait TeamsApi: Send + Sync {
    async fn list_assigned_teams(
        &self,
        project_id: &str,
    ) -> Result<Vec<AtlasAssignedTeam>, RemoteError>;

    async fn add_teams(
        &self,
        project_id: &str,
        teams: &[AtlasAssignedTeam],
    ) -> Result<(), RemoteError>;

    async fn remove_team(&self, project_id: &str, team_id: &str) -> Result<(), RemoteError>;

    async fn get_team_by_name(&self, org_id: &str, team_name: &str)
        -> Result<AtlasTeam, RemoteError>;
}

/// Every family API behind one handle.
pub trait AtlasApi:
    CustomRolesApi
    + NetworkPeeringApi
    + CloudProviderAccessApi
    + AlertConfigurationsApi
    + IntegrationsApi
    + TeamsApi
    + Send
    + Sync
    + 'static
{
}

impl<T> AtlasApi for T where
    T: CustomRolesApi
        + NetworkPeeringApi
        + CloudProviderAccessApi
        + AlertConfigurationsApi
        + IntegrationsApi
        + TeamsApi
        + Send
        + Sync
        + 'static
{
}
