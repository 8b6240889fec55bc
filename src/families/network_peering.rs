//! Network peering connections and their Atlas-side containers.

use super::{converge, gate, ignore_not_found, PassInput};
use crate::apply::{Converge, ItemError, Stage};
use crate::diff::Family;
use crate::normalize::{non_empty, non_empty_owned, same_str};
use crate::project::{NetworkPeer, Provider};
use crate::protection::{self, Identifiable};
use crate::readiness;
use crate::remote::{AtlasApi, AtlasContainer, AtlasPeer, RemoteError};
use crate::status::{ItemState, NetworkPeerStatus, StatusUpdate, PEER_FAILED};
use crate::workflow::reason::NetworkPeeringFailure;
use crate::workflow::{ConditionType, Context, Outcome, Reason, Step};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const PEER_DELETING: &str = "DELETING";
pub const PEER_TERMINATING: &str = "TERMINATING";

const FEATURE: &str = "Network Peering";

fn reason(step: Option<Step>) -> Reason {
    Reason::NetworkPeering(step.map_or(NetworkPeeringFailure::NotReady, Into::into))
}
const AZURE_HINT: &str = "maybe its needed to setup Azure virtual network. error: ";

pub struct NetworkPeering {
    client: Arc<dyn AtlasApi>,
    project_id: String,
    /// Containers by id, listed once per pass.
    containers: HashMap<String, AtlasContainer>,
    /// Previously applied peers; only remote peers matching one may be deleted.
    managed: Vec<NetworkPeer>,
}

impl NetworkPeering {
    pub fn new(
        client: Arc<dyn AtlasApi>,
        project_id: &str,
        containers: HashMap<String, AtlasContainer>,
        previously_applied: &[NetworkPeer],
    ) -> Self {
        Self {
            client,
            project_id: project_id.to_string(),
            containers,
            managed: previously_applied.to_vec(),
        }
    }

    /// Existing container id for the peer, creating the container if needed.
    async fn ensure_container(&self, desired: &NetworkPeer) -> Result<String, RemoteError> {
        let provider = desired.provider_name;
        let region = desired.container_region().unwrap_or_default();
        let mut container = AtlasContainer {
            provider_name: provider.as_str().to_string(),
            atlas_cidr_block: non_empty_owned(desired.atlas_cidr_block.clone()),
            ..Default::default()
        };
        match provider {
            Provider::Aws if !region.is_empty() => container.region_name = Some(aws_region_name(region)),
            Provider::Azure if !region.is_empty() => container.region = Some(region.to_string()),
            _ => {}
        }

        match self.client.create_container(&self.project_id, &container).await {
            Ok(created) => created
                .id
                .ok_or_else(|| RemoteError::Decode("created container has no id".to_string())),
            Err(e) if e.is_conflict() => {
                tracing::debug!(provider = %provider, "container exists, looking it up");
                let existing = self
                    .client
                    .list_containers(&self.project_id, Some(provider.as_str()))
                    .await?;
                existing
                    .into_iter()
                    .find(|c| container_matches(c, desired))
                    .and_then(|c| c.id)
                    .ok_or(e)
            }
            Err(e) => Err(e),
        }
    }
}

/// AWS container regions are upper snake case (`eu-west-1` → `EU_WEST_1`).
pub fn aws_region_name(region: &str) -> String {
    region.replace('-', "_").to_ascii_uppercase()
}

fn container_matches(container: &AtlasContainer, desired: &NetworkPeer) -> bool {
    if !same_str(
        container.atlas_cidr_block.as_deref(),
        desired.atlas_cidr_block.as_deref(),
    ) {
        return false;
    }
    let region = desired.container_region().unwrap_or_default();
    match desired.provider_name {
        Provider::Aws => container.region_name.as_deref().unwrap_or_default() == aws_region_name(region),
        Provider::Azure => container.region.as_deref().unwrap_or_default() == region,
        Provider::Gcp => true,
    }
}

/// Provider of a remote peer, inferred from the provider-specific fields.
pub fn observed_provider(peer: &AtlasPeer) -> Provider {
    if non_empty(peer.aws_account_id.as_deref()).is_some() {
        Provider::Aws
    } else if non_empty(peer.azure_subscription_id.as_deref()).is_some() {
        Provider::Azure
    } else if non_empty(peer.gcp_project_id.as_deref()).is_some() {
        Provider::Gcp
    } else {
        peer.provider_name
            .as_deref()
            .and_then(Provider::parse)
            .unwrap_or_default()
    }
}

/// Remote peer and declared peer describe the same connection.
pub fn same_connection(observed: &AtlasPeer, desired: &NetworkPeer) -> bool {
    if let Some(id) = non_empty(desired.container_id.as_deref()) {
        if non_empty(observed.container_id.as_deref()) != Some(id) {
            return false;
        }
    }
    if let Some(cidr) = non_empty(desired.atlas_cidr_block.as_deref()) {
        if non_empty(observed.atlas_cidr_block.as_deref()) != Some(cidr) {
            return false;
        }
    }
    if observed_provider(observed) != desired.provider_name {
        return false;
    }
    match desired.provider_name {
        Provider::Aws => {
            same_str(observed.vpc_id.as_deref(), desired.vpc_id.as_deref())
                && same_str(observed.aws_account_id.as_deref(), desired.aws_account_id.as_deref())
                && same_str(
                    observed.route_table_cidr_block.as_deref(),
                    desired.route_table_cidr_block.as_deref(),
                )
        }
        Provider::Gcp => {
            same_str(observed.gcp_project_id.as_deref(), desired.gcp_project_id.as_deref())
                && same_str(observed.network_name.as_deref(), desired.network_name.as_deref())
        }
        Provider::Azure => {
            same_str(
                observed.azure_subscription_id.as_deref(),
                desired.azure_subscription_id.as_deref(),
            ) && same_str(
                observed.azure_directory_id.as_deref(),
                desired.azure_directory_id.as_deref(),
            ) && same_str(
                observed.resource_group_name.as_deref(),
                desired.resource_group_name.as_deref(),
            ) && same_str(observed.v_net_name.as_deref(), desired.v_net_name.as_deref())
        }
    }
}

fn connection_identity(provider: Provider, parts: &[Option<&str>]) -> String {
    let mut id = provider.as_str().to_string();
    for part in parts {
        id.push(':');
        id.push_str(non_empty(*part).unwrap_or_default());
    }
    id
}

impl Identifiable for NetworkPeer {
    fn identifier(&self) -> String {
        match self.provider_name {
            Provider::Aws => connection_identity(
                Provider::Aws,
                &[
                    self.aws_account_id.as_deref(),
                    self.vpc_id.as_deref(),
                    self.route_table_cidr_block.as_deref(),
                ],
            ),
            Provider::Gcp => connection_identity(
                Provider::Gcp,
                &[self.gcp_project_id.as_deref(), self.network_name.as_deref()],
            ),
            Provider::Azure => connection_identity(
                Provider::Azure,
                &[
                    self.azure_subscription_id.as_deref(),
                    self.azure_directory_id.as_deref(),
                    self.resource_group_name.as_deref(),
                    self.v_net_name.as_deref(),
                ],
            ),
        }
    }
}

impl Identifiable for AtlasPeer {
    fn identifier(&self) -> String {
        match observed_provider(self) {
            Provider::Aws => connection_identity(
                Provider::Aws,
                &[
                    self.aws_account_id.as_deref(),
                    self.vpc_id.as_deref(),
                    self.route_table_cidr_block.as_deref(),
                ],
            ),
            Provider::Gcp => connection_identity(
                Provider::Gcp,
                &[self.gcp_project_id.as_deref(), self.network_name.as_deref()],
            ),
            Provider::Azure => connection_identity(
                Provider::Azure,
                &[
                    self.azure_subscription_id.as_deref(),
                    self.azure_directory_id.as_deref(),
                    self.resource_group_name.as_deref(),
                    self.v_net_name.as_deref(),
                ],
            ),
        }
    }
}

fn container_identity(provider: &str, cidr: Option<&str>) -> String {
    format!("{}:{}", provider.to_ascii_uppercase(), non_empty(cidr).unwrap_or_default())
}

/// Container identities a peer list refers to.
fn desired_containers(peers: &[NetworkPeer], known: &HashMap<String, AtlasContainer>) -> Vec<String> {
    peers
        .iter()
        .filter_map(|peer| {
            if let Some(id) = non_empty(peer.container_id.as_deref()) {
                return known
                    .get(id)
                    .map(|c| container_identity(&c.provider_name, c.atlas_cidr_block.as_deref()));
            }
            non_empty(peer.atlas_cidr_block.as_deref())
                .map(|cidr| container_identity(peer.provider_name.as_str(), Some(cidr)))
        })
        .collect()
}

fn vpc_of(provider: Provider, peer: &AtlasPeer) -> String {
    let vpc = match provider {
        Provider::Gcp => peer.network_name.as_deref(),
        Provider::Azure => peer.v_net_name.as_deref(),
        Provider::Aws => peer.vpc_id.as_deref(),
    };
    vpc.unwrap_or_default().to_string()
}

fn desired_vpc(peer: &NetworkPeer) -> String {
    let vpc = match peer.provider_name {
        Provider::Gcp => peer.network_name.as_deref(),
        Provider::Azure => peer.v_net_name.as_deref(),
        Provider::Aws => peer.vpc_id.as_deref(),
    };
    vpc.unwrap_or_default().to_string()
}

pub fn to_atlas(peer: &NetworkPeer, container_id: &str) -> AtlasPeer {
    let mut wire = AtlasPeer {
        provider_name: Some(peer.provider_name.as_str().to_string()),
        container_id: Some(container_id.to_string()),
        ..Default::default()
    };
    match peer.provider_name {
        Provider::Aws => {
            wire.accepter_region_name = non_empty_owned(peer.accepter_region_name.clone());
            wire.aws_account_id = non_empty_owned(peer.aws_account_id.clone());
            wire.route_table_cidr_block = non_empty_owned(peer.route_table_cidr_block.clone());
            wire.vpc_id = non_empty_owned(peer.vpc_id.clone());
        }
        Provider::Gcp => {
            wire.gcp_project_id = non_empty_owned(peer.gcp_project_id.clone());
            wire.network_name = non_empty_owned(peer.network_name.clone());
        }
        Provider::Azure => {
            wire.azure_directory_id = non_empty_owned(peer.azure_directory_id.clone());
            wire.azure_subscription_id = non_empty_owned(peer.azure_subscription_id.clone());
            wire.resource_group_name = non_empty_owned(peer.resource_group_name.clone());
            wire.v_net_name = non_empty_owned(peer.v_net_name.clone());
        }
    }
    wire
}

/// Provider-specific required fields, checked before any remote call.
pub fn validate_peer(peer: &NetworkPeer) -> Result<(), String> {
    let missing = |value: &Option<String>| non_empty(value.as_deref()).is_none();

    if missing(&peer.container_id) && missing(&peer.atlas_cidr_block) {
        return Err("containerID or AtlasCIDRBlock must be specified".to_string());
    }
    let required: Vec<(&Option<String>, &str)> = match peer.provider_name {
        Provider::Aws => vec![
            (&peer.accepter_region_name, "accepterRegionName is required for AWS"),
            (&peer.aws_account_id, "awsAccountId is required for AWS"),
            (&peer.route_table_cidr_block, "routeTableCIDRBlock is required for AWS"),
            (&peer.vpc_id, "vpcId is required for AWS"),
        ],
        Provider::Gcp => vec![
            (&peer.gcp_project_id, "gcpProjectId is required for GCP"),
            (&peer.network_name, "networkName is required for GCP"),
        ],
        Provider::Azure => vec![
            (&peer.azure_directory_id, "azureDirectoryId is required for Azure"),
            (&peer.azure_subscription_id, "azureSubscriptionId is required for Azure"),
            (&peer.resource_group_name, "resourceGroupName is required for Azure"),
            (&peer.v_net_name, "vNetName is required for Azure"),
        ],
    };
    for (value, message) in required {
        if missing(value) {
            return Err(message.to_string());
        }
    }
    Ok(())
}

fn peer_status(
    peer: &AtlasPeer,
    provider: Provider,
    container: Option<&AtlasContainer>,
    state: ItemState,
) -> NetworkPeerStatus {
    let failed_remotely = peer.status.as_deref() == Some(PEER_FAILED)
        || peer.status_name.as_deref() == Some(PEER_FAILED);
    let error_message = if failed_remotely {
        non_empty_owned(peer.error_message.clone())
            .or_else(|| non_empty_owned(peer.error_state_name.clone()))
            .or_else(|| Some("network peer failed".to_string()))
    } else {
        None
    };

    NetworkPeerStatus {
        id: peer.id.clone(),
        provider_name: provider,
        vpc: vpc_of(provider, peer),
        container_id: peer.container_id.clone(),
        connection_id: peer.connection_id.clone(),
        status: peer.status.clone(),
        status_name: peer.status_name.clone(),
        atlas_network_name: container.and_then(|c| non_empty_owned(c.network_name.clone())),
        atlas_gcp_project_id: container.and_then(|c| non_empty_owned(c.gcp_project_id.clone())),
        error_message,
        state,
    }
}

impl Family for NetworkPeering {
    type Desired = NetworkPeer;
    type Observed = AtlasPeer;

    fn key(&self, observed: &AtlasPeer) -> String {
        observed.id.clone().unwrap_or_else(|| observed.identifier())
    }

    fn matches(&self, observed: &AtlasPeer, desired: &NetworkPeer) -> bool {
        same_connection(observed, desired)
    }

    fn merge(&self, observed: &AtlasPeer, desired: &NetworkPeer) -> AtlasPeer {
        let mut merged = observed.clone();
        merged.provider_name = Some(desired.provider_name.as_str().to_string());
        merged.accepter_region_name = non_empty_owned(desired.accepter_region_name.clone());
        merged
    }

    fn is_deleting(&self, observed: &AtlasPeer) -> bool {
        observed.status.as_deref() == Some(PEER_DELETING)
            || matches!(
                observed.status_name.as_deref(),
                Some(PEER_DELETING) | Some(PEER_TERMINATING)
            )
    }

    fn owns(&self, observed: &AtlasPeer) -> bool {
        self.managed.iter().any(|peer| same_connection(observed, peer))
    }
}

#[async_trait]
impl Converge for NetworkPeering {
    type Status = NetworkPeerStatus;

    fn name(&self) -> &'static str {
        "network peers"
    }

    fn validate(&self, desired: &NetworkPeer) -> Result<(), String> {
        validate_peer(desired)
    }

    async fn create(&self, desired: &NetworkPeer) -> Result<NetworkPeerStatus, ItemError> {
        let container_id = match non_empty(desired.container_id.as_deref()) {
            Some(id) => id.to_string(),
            None => self
                .ensure_container(desired)
                .await
                .map_err(|e| ItemError::step("failed to create container for network peer", e))?,
        };

        let created = self
            .client
            .create_peer(&self.project_id, &to_atlas(desired, &container_id))
            .await
            .map_err(|e| ItemError::step("failed to create network peer", e))?;

        let container = match desired.provider_name {
            Provider::Gcp | Provider::Azure => Some(
                self.client
                    .get_container(&self.project_id, &container_id)
                    .await
                    .map_err(|e| ItemError::step("failed to get container for network peer status", e))?,
            ),
            Provider::Aws => None,
        };

        tracing::info!(
            provider = %desired.provider_name,
            container_id = %container_id,
            "created network peer"
        );
        Ok(peer_status(
            &created,
            desired.provider_name,
            container.as_ref(),
            ItemState::Created,
        ))
    }

    /// Peers are immutable remotely; matched pairs only refresh status.
    async fn update(
        &self,
        observed: &AtlasPeer,
        desired: &NetworkPeer,
    ) -> Result<NetworkPeerStatus, ItemError> {
        Ok(self.unchanged(observed, desired))
    }

    async fn delete(&self, observed: &AtlasPeer) -> Result<(), ItemError> {
        let id = non_empty(observed.id.as_deref())
            .ok_or_else(|| ItemError::Invalid("network peer has no id".to_string()))?;
        ignore_not_found(self.client.delete_peer(&self.project_id, id).await)?;
        Ok(())
    }

    fn unchanged(&self, observed: &AtlasPeer, desired: &NetworkPeer) -> NetworkPeerStatus {
        let container = observed
            .container_id
            .as_deref()
            .and_then(|id| self.containers.get(id));
        peer_status(observed, desired.provider_name, container, ItemState::Created)
    }

    fn failed(&self, desired: &NetworkPeer, stage: Stage, message: String) -> NetworkPeerStatus {
        let mut message = match stage {
            Stage::Validate => format!("failed to validate network peer: {}", message),
            _ => message,
        };
        if desired.provider_name == Provider::Azure {
            message = format!("{}{}", AZURE_HINT, message);
        }
        NetworkPeerStatus {
            provider_name: desired.provider_name,
            vpc: desired_vpc(desired),
            status: Some(PEER_FAILED.to_string()),
            error_message: Some(message),
            state: stage.failed_state(),
            ..Default::default()
        }
    }

    /// Remove containers no surviving peer points at.
    async fn cleanup(&self, statuses: &[NetworkPeerStatus]) -> Result<(), RemoteError> {
        if self.managed.is_empty() {
            return Ok(());
        }
        let referenced: HashSet<&str> = statuses
            .iter()
            .filter_map(|s| s.container_id.as_deref())
            .collect();

        let containers = self.client.list_containers(&self.project_id, None).await?;
        for container in containers {
            if container.provisioned.unwrap_or(false) {
                continue;
            }
            let Some(id) = non_empty(container.id.as_deref()) else {
                continue;
            };
            if referenced.contains(id) {
                continue;
            }
            match self.client.delete_container(&self.project_id, id).await {
                Ok(()) => tracing::debug!(container_id = %id, "deleted unused container"),
                Err(e) if e.is_conflict() || e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Every remote peer across providers, with missing CIDRs filled from containers.
async fn observe(
    ctx: &Context,
    client: &Arc<dyn AtlasApi>,
    project_id: &str,
) -> Result<(Vec<AtlasPeer>, HashMap<String, AtlasContainer>), RemoteError> {
    let mut peers = Vec::new();
    for provider in Provider::ALL {
        let listed = ctx
            .guard(client.list_peers(project_id, Some(provider.as_str())))
            .await?;
        peers.extend(listed);
    }

    let mut containers: HashMap<String, AtlasContainer> = ctx
        .guard(client.list_containers(project_id, None))
        .await?
        .into_iter()
        .filter_map(|c| c.id.clone().map(|id| (id, c)))
        .collect();

    for peer in &mut peers {
        if peer.provider_name.is_none() {
            peer.provider_name = Some(observed_provider(peer).as_str().to_string());
        }
        if non_empty(peer.atlas_cidr_block.as_deref()).is_some() {
            continue;
        }
        let Some(container_id) = non_empty_owned(peer.container_id.clone()) else {
            continue;
        };
        if !containers.contains_key(&container_id) {
            match ctx.guard(client.get_container(project_id, &container_id)).await {
                Ok(container) => {
                    containers.insert(container_id.clone(), container);
                }
                Err(RemoteError::Cancelled) => return Err(RemoteError::Cancelled),
                Err(e) => {
                    tracing::debug!(container_id = %container_id, error = %e, "container lookup failed");
                    continue;
                }
            }
        }
        peer.atlas_cidr_block = containers
            .get(&container_id)
            .and_then(|c| c.atlas_cidr_block.clone());
    }

    Ok((peers, containers))
}

/// Converge the project's network peering connections.
pub async fn ensure_network_peers(ctx: &mut Context, input: PassInput<'_>) -> Outcome {
    let condition = ConditionType::NetworkPeerReady;
    let desired = &input.spec.network_peers;
    let client = ctx.client();

    let (observed, containers) = match observe(ctx, &client, input.project_id).await {
        Ok(found) => found,
        Err(e) => {
            let outcome = Outcome::terminate(
                reason(Some(Step::Observe)),
                e.context("network peers", "list"),
            );
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };

    let unprovisioned: Vec<String> = containers
        .values()
        .filter(|c| !c.provisioned.unwrap_or(false))
        .map(|c| container_identity(&c.provider_name, c.atlas_cidr_block.as_deref()))
        .collect();
    let allowed = protection::can_reconcile(
        input.protected,
        &input.last_applied.network_peers,
        desired,
        &observed,
    ) && protection::can_reconcile(
        input.protected,
        &desired_containers(&input.last_applied.network_peers, &containers),
        &desired_containers(desired, &containers),
        &unprovisioned,
    );
    if let Some(blocked) = gate(ctx, condition, FEATURE, allowed) {
        return blocked;
    }

    let family = NetworkPeering::new(client, input.project_id, containers, &input.last_applied.network_peers);
    let applied = match converge(ctx, &family, &observed, desired).await {
        Ok(applied) => applied,
        Err(e) => {
            let outcome = Outcome::terminate(reason(e.step()), e.to_string());
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };

    let outcome = readiness::aggregate(&applied.statuses, desired.len(), reason);
    ctx.ensure_status(StatusUpdate::NetworkPeers(applied.statuses));
    readiness::finish_family(ctx, condition, desired.len(), outcome, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aws_peer() -> NetworkPeer {
        NetworkPeer {
            provider_name: Provider::Aws,
            atlas_cidr_block: Some("10.8.0.0/21".into()),
            accepter_region_name: Some("eu-west-1".into()),
            aws_account_id: Some("123456789012".into()),
            route_table_cidr_block: Some("10.0.0.0/24".into()),
            vpc_id: Some("vpc-1".into()),
            ..Default::default()
        }
    }

    fn remote_aws() -> AtlasPeer {
        AtlasPeer {
            id: Some("peer-1".into()),
            provider_name: Some("AWS".into()),
            container_id: Some("c-1".into()),
            atlas_cidr_block: Some("10.8.0.0/21".into()),
            aws_account_id: Some("123456789012".into()),
            route_table_cidr_block: Some("10.0.0.0/24".into()),
            vpc_id: Some("vpc-1".into()),
            status_name: Some("AVAILABLE".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_region_name_conversion() {
        assert_eq!(aws_region_name("eu-west-1"), "EU_WEST_1");
    }

    #[test]
    fn test_same_connection_aws() {
        assert!(same_connection(&remote_aws(), &aws_peer()));

        let mut other_vpc = aws_peer();
        other_vpc.vpc_id = Some("vpc-2".into());
        assert!(!same_connection(&remote_aws(), &other_vpc));
    }

    #[test]
    fn test_same_connection_checks_cidr_and_container() {
        let mut peer = aws_peer();
        peer.atlas_cidr_block = Some("192.168.0.0/21".into());
        assert!(!same_connection(&remote_aws(), &peer));

        let mut peer = aws_peer();
        peer.container_id = Some("c-other".into());
        assert!(!same_connection(&remote_aws(), &peer));
    }

    #[test]
    fn test_provider_inferred_from_fields() {
        let remote = AtlasPeer {
            gcp_project_id: Some("p".into()),
            ..Default::default()
        };
        assert_eq!(observed_provider(&remote), Provider::Gcp);
        assert_eq!(observed_provider(&AtlasPeer::default()), Provider::Aws);
    }

    #[test]
    fn test_validation_messages() {
        let mut peer = aws_peer();
        peer.atlas_cidr_block = None;
        assert_eq!(
            validate_peer(&peer).unwrap_err(),
            "containerID or AtlasCIDRBlock must be specified"
        );

        let mut peer = aws_peer();
        peer.accepter_region_name = None;
        assert_eq!(
            validate_peer(&peer).unwrap_err(),
            "accepterRegionName is required for AWS"
        );

        let azure = NetworkPeer {
            provider_name: Provider::Azure,
            atlas_cidr_block: Some("10.0.0.0/21".into()),
            azure_directory_id: Some("d".into()),
            azure_subscription_id: Some("s".into()),
            resource_group_name: Some("rg".into()),
            ..Default::default()
        };
        assert_eq!(validate_peer(&azure).unwrap_err(), "vNetName is required for Azure");
        assert!(validate_peer(&aws_peer()).is_ok());
    }

    #[test]
    fn test_identity_is_shared_between_remote_and_declared() {
        assert_eq!(remote_aws().identifier(), aws_peer().identifier());
    }

    #[test]
    fn test_wire_peer_only_carries_provider_fields() {
        let wire = to_atlas(&aws_peer(), "c-1");
        assert_eq!(wire.container_id.as_deref(), Some("c-1"));
        assert_eq!(wire.accepter_region_name.as_deref(), Some("eu-west-1"));
        assert!(wire.gcp_project_id.is_none());
        assert!(wire.atlas_cidr_block.is_none());
    }

    #[test]
    fn test_remote_failure_surfaces_error() {
        let mut remote = remote_aws();
        remote.status_name = Some(PEER_FAILED.into());
        remote.error_message = Some("route conflict".into());
        let status = peer_status(&remote, Provider::Aws, None, ItemState::Created);
        assert_eq!(status.error_message.as_deref(), Some("route conflict"));
    }
}
