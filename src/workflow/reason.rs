//! Condition reason codes.
//!
//! Reasons are grouped per resource family so that every call site mapping an
//! [`Outcome`](super::Outcome) to a condition matches over a closed set.

use serde::{Serialize, Serializer};
use std::fmt;

/// Reason attached to a non-ok outcome and persisted on the matching condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// Unexpected internal failure (e.g. undecodable last-applied annotation)
    Internal,
    /// Deletion protection refused to mutate diverged remote state
    DeletionProtection,
    CustomRoles(CustomRoleFailure),
    NetworkPeering(NetworkPeeringFailure),
    CloudProviderIntegration(CloudIntegrationFailure),
    AlertConfigurations(AlertConfigurationFailure),
    Integrations(IntegrationFailure),
    Teams(TeamFailure),
}

/// Part of a family pass that went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Listing the remote state
    Observe,
    Create,
    /// Update, or reauthorization for cloud provider roles
    Update,
    /// Delete, deauthorize or auxiliary cleanup
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomRoleFailure {
    /// Entries still converging, or failures across several steps
    NotReady,
    NotObtained,
    NotCreated,
    NotUpdated,
    NotDeleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkPeeringFailure {
    /// Peers not yet available, or failures across several steps
    NotReady,
    NotObtained,
    NotCreated,
    NotUpdated,
    /// Includes orphaned container cleanup
    NotDeleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudIntegrationFailure {
    /// Roles not yet authorized, or failures across several steps
    NotReady,
    NotObtained,
    NotCreated,
    /// Authorization failed
    NotAuthorized,
    /// Deauthorization failed
    NotDeauthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertConfigurationFailure {
    NotReady,
    NotObtained,
    NotCreated,
    NotUpdated,
    NotDeleted,
}

impl From<Step> for CustomRoleFailure {
    fn from(step: Step) -> Self {
        match step {
            Step::Observe => CustomRoleFailure::NotObtained,
            Step::Create => CustomRoleFailure::NotCreated,
            Step::Update => CustomRoleFailure::NotUpdated,
            Step::Delete => CustomRoleFailure::NotDeleted,
        }
    }
}

impl From<Step> for NetworkPeeringFailure {
    fn from(step: Step) -> Self {
        match step {
            Step::Observe => NetworkPeeringFailure::NotObtained,
            Step::Create => NetworkPeeringFailure::NotCreated,
            Step::Update => NetworkPeeringFailure::NotUpdated,
            Step::Delete => NetworkPeeringFailure::NotDeleted,
        }
    }
}

impl From<Step> for CloudIntegrationFailure {
    fn from(step: Step) -> Self {
        match step {
            Step::Observe => CloudIntegrationFailure::NotObtained,
            Step::Create => CloudIntegrationFailure::NotCreated,
            Step::Update => CloudIntegrationFailure::NotAuthorized,
            Step::Delete => CloudIntegrationFailure::NotDeauthorized,
        }
    }
}

impl From<Step> for AlertConfigurationFailure {
    fn from(step: Step) -> Self {
        match step {
            Step::Observe => AlertConfigurationFailure::NotObtained,
            Step::Create => AlertConfigurationFailure::NotCreated,
            Step::Update => AlertConfigurationFailure::NotUpdated,
            Step::Delete => AlertConfigurationFailure::NotDeleted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrationFailure {
    /// Remote listing or conversion failed
    Internal,
    /// A create/replace/delete request was rejected
    Request,
    /// Integrations still converging
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamFailure {
    /// Team assignment could not be synchronized
    Unavailable,
}

impl Reason {
    /// Persisted reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Internal => "InternalError",
            Reason::DeletionProtection => "AtlasDeletionProtection",
            Reason::CustomRoles(failure) => match failure {
                CustomRoleFailure::NotReady => "ProjectCustomRolesReady",
                CustomRoleFailure::NotObtained => "ProjectCustomRolesNotObtainedFromAtlas",
                CustomRoleFailure::NotCreated => "ProjectCustomRoleNotCreatedInAtlas",
                CustomRoleFailure::NotUpdated => "ProjectCustomRoleNotUpdatedInAtlas",
                CustomRoleFailure::NotDeleted => "ProjectCustomRoleNotDeletedInAtlas",
            },
            Reason::NetworkPeering(failure) => match failure {
                NetworkPeeringFailure::NotReady => "ProjectNetworkPeerIsNotReadyInAtlas",
                NetworkPeeringFailure::NotObtained => "ProjectNetworkPeersNotObtainedFromAtlas",
                NetworkPeeringFailure::NotCreated => "ProjectNetworkPeerNotCreatedInAtlas",
                NetworkPeeringFailure::NotUpdated => "ProjectNetworkPeerNotUpdatedInAtlas",
                NetworkPeeringFailure::NotDeleted => "ProjectNetworkPeerNotDeletedInAtlas",
            },
            Reason::CloudProviderIntegration(failure) => match failure {
                CloudIntegrationFailure::NotReady => "ProjectCloudIntegrationsIsNotReadyInAtlas",
                CloudIntegrationFailure::NotObtained => {
                    "ProjectCloudIntegrationsNotObtainedFromAtlas"
                }
                CloudIntegrationFailure::NotCreated => "ProjectCloudIntegrationNotCreatedInAtlas",
                CloudIntegrationFailure::NotAuthorized => {
                    "ProjectCloudIntegrationNotAuthorizedInAtlas"
                }
                CloudIntegrationFailure::NotDeauthorized => {
                    "ProjectCloudIntegrationNotDeauthorizedInAtlas"
                }
            },
            Reason::AlertConfigurations(failure) => match failure {
                AlertConfigurationFailure::NotReady => "ProjectAlertConfigurationIsNotReadyInAtlas",
                AlertConfigurationFailure::NotObtained => {
                    "ProjectAlertConfigurationsNotObtainedFromAtlas"
                }
                AlertConfigurationFailure::NotCreated => {
                    "ProjectAlertConfigurationNotCreatedInAtlas"
                }
                AlertConfigurationFailure::NotUpdated => {
                    "ProjectAlertConfigurationNotUpdatedInAtlas"
                }
                AlertConfigurationFailure::NotDeleted => {
                    "ProjectAlertConfigurationNotDeletedInAtlas"
                }
            },
            Reason::Integrations(IntegrationFailure::Internal) => "ProjectIntegrationInternalError",
            Reason::Integrations(IntegrationFailure::Request) => "ProjectIntegrationRequestError",
            Reason::Integrations(IntegrationFailure::InProgress) => "ProjectIntegrationReady",
            Reason::Teams(TeamFailure::Unavailable) => "ProjectTeamUnavailable",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Reason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_reason_codes() {
        assert_eq!(Reason::Internal.as_str(), "InternalError");
        assert_eq!(
            Reason::DeletionProtection.to_string(),
            "AtlasDeletionProtection"
        );
    }

    #[test]
    fn test_family_reason_codes() {
        assert_eq!(
            Reason::NetworkPeering(NetworkPeeringFailure::NotReady).as_str(),
            "ProjectNetworkPeerIsNotReadyInAtlas"
        );
        assert_eq!(
            Reason::Integrations(IntegrationFailure::Request).as_str(),
            "ProjectIntegrationRequestError"
        );
    }

    #[test]
    fn test_steps_get_distinct_codes() {
        let steps = [Step::Observe, Step::Create, Step::Update, Step::Delete];
        let codes: std::collections::HashSet<&str> = steps
            .iter()
            .map(|step| Reason::CustomRoles((*step).into()).as_str())
            .chain(std::iter::once(
                Reason::CustomRoles(CustomRoleFailure::NotReady).as_str(),
            ))
            .collect();
        assert_eq!(codes.len(), 5);
    }

    #[test]
    fn test_cloud_role_steps_map_to_authorization() {
        assert_eq!(
            CloudIntegrationFailure::from(Step::Update),
            CloudIntegrationFailure::NotAuthorized
        );
        assert_eq!(
            Reason::CloudProviderIntegration(Step::Delete.into()).as_str(),
            "ProjectCloudIntegrationNotDeauthorizedInAtlas"
        );
        assert_eq!(
            Reason::NetworkPeering(Step::Observe.into()).as_str(),
            "ProjectNetworkPeersNotObtainedFromAtlas"
        );
    }

    #[test]
    fn test_reason_serializes_as_code() {
        let json = serde_json::to_string(&Reason::Teams(TeamFailure::Unavailable)).unwrap();
        assert_eq!(json, r#""ProjectTeamUnavailable""#);
    }
}
