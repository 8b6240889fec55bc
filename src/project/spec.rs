//! Desired project state as declared by the user.
//!
//! The same shape is serialized into the last-applied annotation, so every
//! field is camelCase and tolerant of omissions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cloud provider of a peering connection or container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provider {
    #[default]
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "GCP")]
    Gcp,
    #[serde(rename = "AZURE")]
    Azure,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::Gcp => "GCP",
            Provider::Azure => "AZURE",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "AWS" => Some(Provider::Aws),
            "GCP" => Some(Provider::Gcp),
            "AZURE" => Some(Provider::Azure),
            _ => None,
        }
    }

    pub const ALL: [Provider; 3] = [Provider::Aws, Provider::Gcp, Provider::Azure];
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_roles: Vec<CustomRole>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub network_peers: Vec<NetworkPeer>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cloud_provider_integrations: Vec<CloudProviderIntegration>,
    /// Deprecated spelling of `cloud_provider_integrations`; wins when set.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cloud_provider_access_roles: Vec<CloudProviderIntegration>,
    pub alert_configuration_sync_enabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alert_configurations: Vec<AlertConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub integrations: Vec<Integration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<TeamAssignment>,
}

impl ProjectSpec {
    /// Cloud provider roles to converge, honouring the deprecated field.
    pub fn effective_cloud_provider_integrations(&self) -> &[CloudProviderIntegration] {
        if !self.cloud_provider_access_roles.is_empty() {
            &self.cloud_provider_access_roles
        } else {
            &self.cloud_provider_integrations
        }
    }
}

// ============================================================================
// Custom roles
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomRole {
    #[serde(rename = "roleName")]
    pub name: String,
    pub inherited_roles: Vec<InheritedRole>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InheritedRole {
    pub name: String,
    pub database: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Action {
    pub name: String,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Resource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

// ============================================================================
// Network peering
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkPeer {
    pub provider_name: Provider,
    #[serde(rename = "containerId", skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(rename = "atlasCidrBlock", skip_serializing_if = "Option::is_none")]
    pub atlas_cidr_block: Option<String>,
    /// Region of the Atlas-side container; falls back to the accepter region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepter_region_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_account_id: Option<String>,
    #[serde(rename = "routeTableCidrBlock", skip_serializing_if = "Option::is_none")]
    pub route_table_cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_directory_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
    #[serde(rename = "vnetName", skip_serializing_if = "Option::is_none")]
    pub v_net_name: Option<String>,
}

impl NetworkPeer {
    pub fn container_region(&self) -> Option<&str> {
        self.container_region
            .as_deref()
            .or(self.accepter_region_name.as_deref())
    }
}

// ============================================================================
// Cloud provider integration
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudProviderIntegration {
    pub provider_name: String,
    /// Empty until the user has set up the trust relationship.
    pub iam_assumed_role_arn: String,
}

// ============================================================================
// Alert configurations
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertConfiguration {
    pub enabled: bool,
    pub event_type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_override: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<Matcher>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_threshold: Option<MetricThreshold>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Matcher {
    pub field_name: String,
    pub operator: String,
    pub value: String,
}

/// Threshold values are declared as strings and parsed on conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Threshold {
    pub operator: String,
    pub units: String,
    pub threshold: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricThreshold {
    pub metric_name: String,
    pub operator: String,
    pub threshold: String,
    pub units: String,
    pub mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Notification {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datadog_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ops_genie_api_key: Option<String>,
}

// ============================================================================
// Integrations
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Integration {
    #[serde(rename = "type")]
    pub integration_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub microsoft_teams_webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_discovery: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

// ============================================================================
// Teams
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamAssignment {
    pub team_name: String,
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_tolerates_missing_sections() {
        let spec: ProjectSpec = serde_json::from_str(r#"{"name":"p"}"#).unwrap();
        assert_eq!(spec.name, "p");
        assert!(spec.custom_roles.is_empty());
        assert!(!spec.alert_configuration_sync_enabled);
    }

    #[test]
    fn test_deprecated_cloud_roles_take_precedence() {
        let spec = ProjectSpec {
            cloud_provider_integrations: vec![CloudProviderIntegration {
                provider_name: "AWS".into(),
                iam_assumed_role_arn: "arn:new".into(),
            }],
            cloud_provider_access_roles: vec![CloudProviderIntegration {
                provider_name: "AWS".into(),
                iam_assumed_role_arn: "arn:old".into(),
            }],
            ..Default::default()
        };
        let effective = spec.effective_cloud_provider_integrations();
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].iam_assumed_role_arn, "arn:old");
    }

    #[test]
    fn test_peer_provider_defaults_to_aws() {
        let peer: NetworkPeer = serde_json::from_str(r#"{"vpcId":"vpc-1"}"#).unwrap();
        assert_eq!(peer.provider_name, Provider::Aws);
    }

    #[test]
    fn test_container_region_falls_back_to_accepter_region() {
        let peer = NetworkPeer {
            accepter_region_name: Some("eu-west-1".into()),
            ..Default::default()
        };
        assert_eq!(peer.container_region(), Some("eu-west-1"));
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(Provider::parse("azure"), Some(Provider::Azure));
        assert_eq!(Provider::parse("oracle"), None);
    }
}
