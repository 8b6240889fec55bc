//! Per-family status records.

use super::{ItemState, ItemStatus};
use crate::project::Provider;
use serde::{Deserialize, Serialize};

/// Remote peer status reported once the connection is usable.
pub const PEER_AVAILABLE: &str = "AVAILABLE";
pub const PEER_FAILED: &str = "FAILED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRoleStatus {
    pub name: String,
    pub state: ItemState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ItemStatus for CustomRoleStatus {
    fn state(&self) -> ItemState {
        self.state
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// Last known state of one peering connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPeerStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub provider_name: Provider,
    /// VPC id (AWS), network name (GCP) or VNet name (Azure).
    pub vpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    /// GCP and Azure peer status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// AWS peer status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atlas_network_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atlas_gcp_project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub state: ItemState,
}

impl ItemStatus for NetworkPeerStatus {
    fn state(&self) -> ItemState {
        self.state
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    fn is_ready(&self) -> bool {
        if self.state.is_failed() {
            return false;
        }
        match self.provider_name {
            Provider::Gcp => {
                self.status.as_deref() == Some(PEER_AVAILABLE)
                    && self.atlas_network_name.is_some()
                    && self.atlas_gcp_project_id.is_some()
            }
            Provider::Azure => self.status.as_deref() == Some(PEER_AVAILABLE),
            Provider::Aws => self.status_name.as_deref() == Some(PEER_AVAILABLE),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureUsageStatus {
    pub feature_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feature_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudProviderIntegrationStatus {
    pub provider_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub iam_assumed_role_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atlas_aws_account_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atlas_assumed_role_external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_usages: Vec<FeatureUsageStatus>,
    pub state: ItemState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ItemStatus for CloudProviderIntegrationStatus {
    fn state(&self) -> ItemState {
        self.state
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    fn is_ready(&self) -> bool {
        self.state == ItemState::Authorized
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfigurationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub event_type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    pub state: ItemState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ItemStatus for AlertConfigurationStatus {
    fn state(&self) -> ItemState {
        self.state
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStatus {
    #[serde(rename = "type")]
    pub integration_type: String,
    pub state: ItemState,
    /// Remote content confirmed equal to the desired content.
    pub in_sync: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ItemStatus for IntegrationStatus {
    fn state(&self) -> ItemState {
        self.state
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    fn is_ready(&self) -> bool {
        self.in_sync && self.state.is_success()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStatus {
    pub team_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    pub state: ItemState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ItemStatus for TeamStatus {
    fn state(&self) -> ItemState {
        self.state
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}
