//! Per-item convergence state and the project status document.

pub mod items;

pub use items::{
    AlertConfigurationStatus, CloudProviderIntegrationStatus, CustomRoleStatus,
    FeatureUsageStatus, IntegrationStatus, NetworkPeerStatus, PrometheusStatus, TeamStatus,
    PEER_AVAILABLE, PEER_FAILED,
};

use crate::workflow::Conditions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Last known convergence state of one desired item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemState {
    #[default]
    New,
    Created,
    Updated,
    Authorized,
    FailedToCreate,
    FailedToUpdate,
    FailedToAuthorize,
    PendingDeauthorize,
    FailedToDeauthorize,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::New => "NEW",
            ItemState::Created => "CREATED",
            ItemState::Updated => "UPDATED",
            ItemState::Authorized => "AUTHORIZED",
            ItemState::FailedToCreate => "FAILED_TO_CREATE",
            ItemState::FailedToUpdate => "FAILED_TO_UPDATE",
            ItemState::FailedToAuthorize => "FAILED_TO_AUTHORIZE",
            ItemState::PendingDeauthorize => "DEAUTHORIZE",
            ItemState::FailedToDeauthorize => "FAILED_TO_DEAUTHORIZE",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            ItemState::FailedToCreate
                | ItemState::FailedToUpdate
                | ItemState::FailedToAuthorize
                | ItemState::FailedToDeauthorize
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ItemState::Created | ItemState::Updated | ItemState::Authorized
        )
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common view over every family's status record.
pub trait ItemStatus {
    fn state(&self) -> ItemState;

    /// Populated only for failed items.
    fn error_message(&self) -> Option<&str>;

    /// Terminal success for this family.
    fn is_ready(&self) -> bool {
        self.state().is_success()
    }
}

/// Slot a [`StatusUpdate`] writes to; one update per slot survives a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusSlot {
    CustomRoles,
    NetworkPeers,
    CloudProviderIntegrations,
    AlertConfigurations,
    Integrations,
    Prometheus,
    Teams,
}

/// A computed replacement for one slot of the project status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    CustomRoles(Vec<CustomRoleStatus>),
    NetworkPeers(Vec<NetworkPeerStatus>),
    CloudProviderIntegrations(Vec<CloudProviderIntegrationStatus>),
    AlertConfigurations(Vec<AlertConfigurationStatus>),
    Integrations(Vec<IntegrationStatus>),
    Prometheus(Option<PrometheusStatus>),
    Teams(Vec<TeamStatus>),
}

impl StatusUpdate {
    pub fn slot(&self) -> StatusSlot {
        match self {
            StatusUpdate::CustomRoles(_) => StatusSlot::CustomRoles,
            StatusUpdate::NetworkPeers(_) => StatusSlot::NetworkPeers,
            StatusUpdate::CloudProviderIntegrations(_) => StatusSlot::CloudProviderIntegrations,
            StatusUpdate::AlertConfigurations(_) => StatusSlot::AlertConfigurations,
            StatusUpdate::Integrations(_) => StatusSlot::Integrations,
            StatusUpdate::Prometheus(_) => StatusSlot::Prometheus,
            StatusUpdate::Teams(_) => StatusSlot::Teams,
        }
    }
}

/// Persisted status of a declared project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    #[serde(default)]
    pub conditions: Conditions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_roles: Vec<CustomRoleStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_peers: Vec<NetworkPeerStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cloud_provider_integrations: Vec<CloudProviderIntegrationStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alert_configurations: Vec<AlertConfigurationStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integrations: Vec<IntegrationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<PrometheusStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<TeamStatus>,
}

impl ProjectStatus {
    pub fn apply(&mut self, update: StatusUpdate) {
        match update {
            StatusUpdate::CustomRoles(items) => self.custom_roles = items,
            StatusUpdate::NetworkPeers(items) => self.network_peers = items,
            StatusUpdate::CloudProviderIntegrations(items) => {
                self.cloud_provider_integrations = items
            }
            StatusUpdate::AlertConfigurations(items) => self.alert_configurations = items,
            StatusUpdate::Integrations(items) => self.integrations = items,
            StatusUpdate::Prometheus(prometheus) => self.prometheus = prometheus,
            StatusUpdate::Teams(items) => self.teams = items,
        }
    }

    pub fn apply_all(&mut self, updates: impl IntoIterator<Item = StatusUpdate>) {
        for update in updates {
            self.apply(update);
        }
    }
}
