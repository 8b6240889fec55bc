//! Shared test utilities for converge integration tests.
//!
//! Provides an in-memory Atlas fake implementing every family API, with
//! call recording and per-operation failure injection, plus builders for
//! declared projects.

#![allow(dead_code)]

use async_trait::async_trait;
use converge::config::ReconcileConfig;
use converge::project::{ProjectReconciler, ProjectSpec};
use converge::remote::{
    AlertConfigurationsApi, AtlasAlertConfig, AtlasAssignedTeam, AtlasCloudProviderRole,
    AtlasContainer, AtlasCustomRole, AtlasIntegration, AtlasPeer, AtlasTeam,
    CloudProviderAccessApi, CustomRolesApi, IntegrationsApi, NetworkPeeringApi, RemoteError,
    TeamsApi,
};
use converge::status::ProjectStatus;
use converge::store::{DeclarativeStore, DeclaredProject, InMemoryStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// =============================================================================
// Well-Known Test Constants
// =============================================================================

pub const PROJECT_ID: &str = "5f1e2d3c4b5a697887766554";
pub const ORG_ID: &str = "5a0a1e7e0f2912c554080adc";
pub const IDENTITY: &str = "default/my-project";

// =============================================================================
// In-memory Atlas
// =============================================================================

#[derive(Default)]
struct State {
    custom_roles: Vec<AtlasCustomRole>,
    peers: Vec<AtlasPeer>,
    containers: Vec<AtlasContainer>,
    cloud_roles: Vec<AtlasCloudProviderRole>,
    alert_configs: Vec<AtlasAlertConfig>,
    integrations: Vec<AtlasIntegration>,
    org_teams: HashMap<String, String>,
    assigned_teams: Vec<AtlasAssignedTeam>,
    next_id: u32,
}

impl State {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

/// Fake remote. Operations are recorded as `"operation:argument"`.
#[derive(Default)]
pub struct FakeAtlas {
    state: Mutex<State>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, RemoteError>>,
}

impl FakeAtlas {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the call recorded as `call` fail with `error`.
    pub fn fail_on(&self, call: &str, error: RemoteError) {
        self.failures
            .lock()
            .unwrap()
            .insert(call.to_string(), error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Recorded calls that change remote state.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                !(c.starts_with("list_") || c.starts_with("get_"))
            })
            .collect()
    }

    fn record(&self, call: String) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call.clone());
        match self.failures.lock().unwrap().get(&call) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    // ----- seeding -----

    pub fn seed_custom_role(&self, role: AtlasCustomRole) {
        self.state.lock().unwrap().custom_roles.push(role);
    }

    pub fn seed_peer(&self, peer: AtlasPeer) {
        self.state.lock().unwrap().peers.push(peer);
    }

    pub fn seed_container(&self, container: AtlasContainer) {
        self.state.lock().unwrap().containers.push(container);
    }

    pub fn seed_cloud_role(&self, role: AtlasCloudProviderRole) {
        self.state.lock().unwrap().cloud_roles.push(role);
    }

    pub fn seed_alert_config(&self, config: AtlasAlertConfig) {
        self.state.lock().unwrap().alert_configs.push(config);
    }

    pub fn seed_integration(&self, integration: AtlasIntegration) {
        self.state.lock().unwrap().integrations.push(integration);
    }

    pub fn seed_org_team(&self, name: &str, id: &str) {
        self.state
            .lock()
            .unwrap()
            .org_teams
            .insert(name.to_string(), id.to_string());
    }

    pub fn seed_assigned_team(&self, team: AtlasAssignedTeam) {
        self.state.lock().unwrap().assigned_teams.push(team);
    }

    // ----- inspection -----

    pub fn custom_role_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .custom_roles
            .iter()
            .map(|r| r.role_name.clone())
            .collect()
    }

    pub fn peers(&self) -> Vec<AtlasPeer> {
        self.state.lock().unwrap().peers.clone()
    }

    pub fn containers(&self) -> Vec<AtlasContainer> {
        self.state.lock().unwrap().containers.clone()
    }

    pub fn cloud_roles(&self) -> Vec<AtlasCloudProviderRole> {
        self.state.lock().unwrap().cloud_roles.clone()
    }

    pub fn alert_configs(&self) -> Vec<AtlasAlertConfig> {
        self.state.lock().unwrap().alert_configs.clone()
    }

    pub fn integrations(&self) -> Vec<AtlasIntegration> {
        self.state.lock().unwrap().integrations.clone()
    }

    pub fn assigned_teams(&self) -> Vec<AtlasAssignedTeam> {
        self.state.lock().unwrap().assigned_teams.clone()
    }
}

fn not_found(what: &str) -> RemoteError {
    RemoteError::api(404, format!("{} not found", what))
}

#[async_trait]
impl CustomRolesApi for FakeAtlas {
    async fn list_custom_roles(&self, project_id: &str) -> Result<Vec<AtlasCustomRole>, RemoteError> {
        self.record(format!("list_custom_roles:{}", project_id))?;
        Ok(self.state.lock().unwrap().custom_roles.clone())
    }

    async fn create_custom_role(
        &self,
        _project_id: &str,
        role: &AtlasCustomRole,
    ) -> Result<AtlasCustomRole, RemoteError> {
        self.record(format!("create_custom_role:{}", role.role_name))?;
        let mut state = self.state.lock().unwrap();
        if state.custom_roles.iter().any(|r| r.role_name == role.role_name) {
            return Err(RemoteError::api(409, "role already exists"));
        }
        state.custom_roles.push(role.clone());
        Ok(role.clone())
    }

    async fn update_custom_role(
        &self,
        _project_id: &str,
        role_name: &str,
        role: &AtlasCustomRole,
    ) -> Result<AtlasCustomRole, RemoteError> {
        self.record(format!("update_custom_role:{}", role_name))?;
        let mut state = self.state.lock().unwrap();
        let existing = state
            .custom_roles
            .iter_mut()
            .find(|r| r.role_name == role_name)
            .ok_or_else(|| not_found("role"))?;
        existing.actions = role.actions.clone();
        existing.inherited_roles = role.inherited_roles.clone();
        Ok(existing.clone())
    }

    async fn delete_custom_role(&self, _project_id: &str, role_name: &str) -> Result<(), RemoteError> {
        self.record(format!("delete_custom_role:{}", role_name))?;
        let mut state = self.state.lock().unwrap();
        let before = state.custom_roles.len();
        state.custom_roles.retain(|r| r.role_name != role_name);
        if state.custom_roles.len() == before {
            return Err(not_found("role"));
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkPeeringApi for FakeAtlas {
    async fn list_peers(
        &self,
        _project_id: &str,
        provider: Option<&str>,
    ) -> Result<Vec<AtlasPeer>, RemoteError> {
        let provider = provider.unwrap_or("AWS");
        self.record(format!("list_peers:{}", provider))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .peers
            .iter()
            .filter(|p| p.provider_name.as_deref().unwrap_or("AWS") == provider)
            .cloned()
            .collect())
    }

    async fn create_peer(&self, _project_id: &str, peer: &AtlasPeer) -> Result<AtlasPeer, RemoteError> {
        let provider = peer.provider_name.clone().unwrap_or_else(|| "AWS".to_string());
        self.record(format!("create_peer:{}", provider))?;
        let mut state = self.state.lock().unwrap();
        let mut created = peer.clone();
        created.id = Some(state.id("peer"));
        if provider == "AWS" {
            created.status_name = Some("PENDING_ACCEPTANCE".to_string());
        } else {
            created.status = Some("ADDING_PEER".to_string());
        }
        state.peers.push(created.clone());
        Ok(created)
    }

    async fn delete_peer(&self, _project_id: &str, peer_id: &str) -> Result<(), RemoteError> {
        self.record(format!("delete_peer:{}", peer_id))?;
        let mut state = self.state.lock().unwrap();
        let before = state.peers.len();
        state.peers.retain(|p| p.id.as_deref() != Some(peer_id));
        if state.peers.len() == before {
            return Err(not_found("peer"));
        }
        Ok(())
    }

    async fn list_containers(
        &self,
        _project_id: &str,
        provider: Option<&str>,
    ) -> Result<Vec<AtlasContainer>, RemoteError> {
        self.record(format!("list_containers:{}", provider.unwrap_or("all")))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .containers
            .iter()
            .filter(|c| provider.is_none_or(|p| c.provider_name == p))
            .cloned()
            .collect())
    }

    async fn get_container(
        &self,
        _project_id: &str,
        container_id: &str,
    ) -> Result<AtlasContainer, RemoteError> {
        self.record(format!("get_container:{}", container_id))?;
        self.state
            .lock()
            .unwrap()
            .containers
            .iter()
            .find(|c| c.id.as_deref() == Some(container_id))
            .cloned()
            .ok_or_else(|| not_found("container"))
    }

    async fn create_container(
        &self,
        _project_id: &str,
        container: &AtlasContainer,
    ) -> Result<AtlasContainer, RemoteError> {
        self.record(format!("create_container:{}", container.provider_name))?;
        let mut state = self.state.lock().unwrap();
        let clash = state.containers.iter().any(|c| {
            c.provider_name == container.provider_name
                && c.atlas_cidr_block == container.atlas_cidr_block
        });
        if clash {
            return Err(RemoteError::api(409, "container already exists"));
        }
        let mut created = container.clone();
        created.id = Some(state.id("container"));
        state.containers.push(created.clone());
        Ok(created)
    }

    async fn delete_container(&self, _project_id: &str, container_id: &str) -> Result<(), RemoteError> {
        self.record(format!("delete_container:{}", container_id))?;
        let mut state = self.state.lock().unwrap();
        let before = state.containers.len();
        state.containers.retain(|c| c.id.as_deref() != Some(container_id));
        if state.containers.len() == before {
            return Err(not_found("container"));
        }
        Ok(())
    }
}

#[async_trait]
impl CloudProviderAccessApi for FakeAtlas {
    async fn list_cloud_provider_roles(
        &self,
        _project_id: &str,
    ) -> Result<Vec<AtlasCloudProviderRole>, RemoteError> {
        self.record("list_cloud_provider_roles".to_string())?;
        Ok(self.state.lock().unwrap().cloud_roles.clone())
    }

    async fn create_cloud_provider_role(
        &self,
        _project_id: &str,
        provider_name: &str,
    ) -> Result<AtlasCloudProviderRole, RemoteError> {
        self.record(format!("create_cloud_provider_role:{}", provider_name))?;
        let mut state = self.state.lock().unwrap();
        let role_id = state.id("role");
        let role = AtlasCloudProviderRole {
            provider_name: provider_name.to_string(),
            role_id: Some(role_id.clone()),
            atlas_aws_account_arn: Some("arn:aws:iam::000000000000:root".to_string()),
            atlas_assumed_role_external_id: Some(format!("external-{}", role_id)),
            created_date: Some("2024-01-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        state.cloud_roles.push(role.clone());
        Ok(role)
    }

    async fn authorize_cloud_provider_role(
        &self,
        _project_id: &str,
        role_id: &str,
        role: &AtlasCloudProviderRole,
    ) -> Result<AtlasCloudProviderRole, RemoteError> {
        self.record(format!("authorize_cloud_provider_role:{}", role_id))?;
        let mut state = self.state.lock().unwrap();
        let existing = state
            .cloud_roles
            .iter_mut()
            .find(|r| r.role_id.as_deref() == Some(role_id))
            .ok_or_else(|| not_found("role"))?;
        existing.iam_assumed_role_arn = role.iam_assumed_role_arn.clone();
        existing.authorized_date = Some("2024-01-02T00:00:00Z".to_string());
        Ok(existing.clone())
    }

    async fn deauthorize_cloud_provider_role(
        &self,
        _project_id: &str,
        _provider_name: &str,
        role_id: &str,
    ) -> Result<(), RemoteError> {
        self.record(format!("deauthorize_cloud_provider_role:{}", role_id))?;
        let mut state = self.state.lock().unwrap();
        let before = state.cloud_roles.len();
        state.cloud_roles.retain(|r| r.role_id.as_deref() != Some(role_id));
        if state.cloud_roles.len() == before {
            return Err(not_found("role"));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertConfigurationsApi for FakeAtlas {
    async fn list_alert_configs(&self, _project_id: &str) -> Result<Vec<AtlasAlertConfig>, RemoteError> {
        self.record("list_alert_configs".to_string())?;
        Ok(self.state.lock().unwrap().alert_configs.clone())
    }

    async fn create_alert_config(
        &self,
        _project_id: &str,
        config: &AtlasAlertConfig,
    ) -> Result<AtlasAlertConfig, RemoteError> {
        self.record(format!("create_alert_config:{}", config.event_type_name))?;
        let mut state = self.state.lock().unwrap();
        let mut created = config.clone();
        created.id = Some(state.id("alert"));
        state.alert_configs.push(created.clone());
        Ok(created)
    }

    async fn delete_alert_config(&self, _project_id: &str, config_id: &str) -> Result<(), RemoteError> {
        self.record(format!("delete_alert_config:{}", config_id))?;
        let mut state = self.state.lock().unwrap();
        let before = state.alert_configs.len();
        state.alert_configs.retain(|c| c.id.as_deref() != Some(config_id));
        if state.alert_configs.len() == before {
            return Err(not_found("alert configuration"));
        }
        Ok(())
    }
}

#[async_trait]
impl IntegrationsApi for FakeAtlas {
    async fn list_integrations(&self, _project_id: &str) -> Result<Vec<AtlasIntegration>, RemoteError> {
        self.record("list_integrations".to_string())?;
        Ok(self.state.lock().unwrap().integrations.clone())
    }

    async fn create_integration(
        &self,
        _project_id: &str,
        integration: &AtlasIntegration,
    ) -> Result<(), RemoteError> {
        self.record(format!("create_integration:{}", integration.integration_type))?;
        let mut state = self.state.lock().unwrap();
        if state
            .integrations
            .iter()
            .any(|i| i.integration_type == integration.integration_type)
        {
            return Err(RemoteError::api(409, "integration already exists"));
        }
        state.integrations.push(integration.clone());
        Ok(())
    }

    async fn replace_integration(
        &self,
        _project_id: &str,
        integration: &AtlasIntegration,
    ) -> Result<(), RemoteError> {
        self.record(format!("replace_integration:{}", integration.integration_type))?;
        let mut state = self.state.lock().unwrap();
        let existing = state
            .integrations
            .iter_mut()
            .find(|i| i.integration_type == integration.integration_type)
            .ok_or_else(|| not_found("integration"))?;
        *existing = integration.clone();
        Ok(())
    }

    async fn delete_integration(&self, _project_id: &str, integration_type: &str) -> Result<(), RemoteError> {
        self.record(format!("delete_integration:{}", integration_type))?;
        let mut state = self.state.lock().unwrap();
        let before = state.integrations.len();
        state
            .integrations
            .retain(|i| i.integration_type != integration_type);
        if state.integrations.len() == before {
            return Err(not_found("integration"));
        }
        Ok(())
    }

    fn prometheus_discovery_url(&self, project_id: &str) -> Option<String> {
        Some(format!(
            "https://cloud.example.com/prometheus/v1.0/groups/{}/discovery",
            project_id
        ))
    }
}

#[async_trait]
impl TeamsApi for FakeAtlas {
    async fn list_assigned_teams(&self, _project_id: &str) -> Result<Vec<AtlasAssignedTeam>, RemoteError> {
        self.record("list_assigned_teams".to_string())?;
        Ok(self.state.lock().unwrap().assigned_teams.clone())
    }

    async fn add_teams(&self, _project_id: &str, teams: &[AtlasAssignedTeam]) -> Result<(), RemoteError> {
        let ids: Vec<&str> = teams.iter().map(|t| t.team_id.as_str()).collect();
        self.record(format!("add_teams:{}", ids.join(",")))?;
        let mut state = self.state.lock().unwrap();
        for team in teams {
            state.assigned_teams.retain(|t| t.team_id != team.team_id);
            state.assigned_teams.push(team.clone());
        }
        Ok(())
    }

    async fn remove_team(&self, _project_id: &str, team_id: &str) -> Result<(), RemoteError> {
        self.record(format!("remove_team:{}", team_id))?;
        let mut state = self.state.lock().unwrap();
        let before = state.assigned_teams.len();
        state.assigned_teams.retain(|t| t.team_id != team_id);
        if state.assigned_teams.len() == before {
            return Err(not_found("team"));
        }
        Ok(())
    }

    async fn get_team_by_name(&self, _org_id: &str, team_name: &str) -> Result<AtlasTeam, RemoteError> {
        self.record(format!("get_team_by_name:{}", team_name))?;
        let state = self.state.lock().unwrap();
        state
            .org_teams
            .get(team_name)
            .map(|id| AtlasTeam {
                id: id.clone(),
                name: team_name.to_string(),
            })
            .ok_or_else(|| not_found("team"))
    }
}

// =============================================================================
// Project Builders
// =============================================================================

pub fn declared(spec: ProjectSpec) -> DeclaredProject {
    DeclaredProject {
        identity: IDENTITY.to_string(),
        project_id: PROJECT_ID.to_string(),
        org_id: ORG_ID.to_string(),
        spec,
        ..Default::default()
    }
}

/// Store seeded with one project, a fake remote and a reconciler over both.
pub fn harness(
    spec: ProjectSpec,
    protected: bool,
) -> (Arc<InMemoryStore>, Arc<FakeAtlas>, ProjectReconciler) {
    let store = Arc::new(InMemoryStore::new());
    store.put(declared(spec));
    let atlas = FakeAtlas::new();
    let config = ReconcileConfig {
        subresource_deletion_protection: protected,
        lookup_concurrency: 2,
    };
    let reconciler = ProjectReconciler::new(store.clone(), atlas.clone(), config);
    (store, atlas, reconciler)
}

/// Store that serves reads but rejects every write, like a host whose API
/// server is unreachable after the project was fetched.
pub struct ReadOnlyStore {
    pub inner: Arc<InMemoryStore>,
}

#[async_trait]
impl DeclarativeStore for ReadOnlyStore {
    async fn get(&self, identity: &str) -> Result<DeclaredProject, StoreError> {
        self.inner.get(identity).await
    }

    async fn apply_last_applied(&self, _identity: &str, _encoded: String) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("read-only".to_string()))
    }

    async fn persist_status(&self, _identity: &str, _status: ProjectStatus) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("read-only".to_string()))
    }
}

/// Replace the declared spec, keeping annotations and status.
pub fn redeclare(store: &InMemoryStore, spec: ProjectSpec) {
    let mut project = store.snapshot(IDENTITY).expect("project is seeded");
    project.spec = spec;
    store.put(project);
}
