//! Third-party integrations (Datadog, Slack, Prometheus, ...).
//!
//! One integration per type. The remote masks secrets, so comparisons only
//! look at the last four characters of secret fields.

use super::{converge, gate, ignore_not_found, PassInput};
use crate::apply::{Converge, ItemError, Stage};
use crate::diff::Family;
use crate::normalize::{self, non_empty_owned, same_secret, same_str};
use crate::project::Integration;
use crate::protection::{self, Identifiable};
use crate::readiness::{self, Readiness};
use crate::remote::{AtlasApi, AtlasIntegration};
use crate::status::{IntegrationStatus, ItemState, PrometheusStatus, StatusUpdate};
use crate::workflow::reason::IntegrationFailure;
use crate::workflow::{ConditionType, Context, Outcome, Reason};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

pub const PROMETHEUS: &str = "PROMETHEUS";
const FEATURE: &str = "Integrations";

pub struct Integrations {
    client: Arc<dyn AtlasApi>,
    project_id: String,
    /// Types applied by an earlier pass; other remote integrations are left alone.
    managed: HashSet<String>,
}

impl Integrations {
    pub fn new(client: Arc<dyn AtlasApi>, project_id: &str, previously_applied: &[Integration]) -> Self {
        Self {
            client,
            project_id: project_id.to_string(),
            managed: previously_applied
                .iter()
                .map(|i| i.integration_type.clone())
                .collect(),
        }
    }
}

impl Identifiable for Integration {
    fn identifier(&self) -> String {
        self.integration_type.clone()
    }
}

impl Identifiable for AtlasIntegration {
    fn identifier(&self) -> String {
        self.integration_type.clone()
    }
}

/// Declared integration equals the (masked) remote one.
pub fn same_integration(declared: &Integration, remote: &AtlasIntegration) -> bool {
    if declared.integration_type != remote.integration_type {
        return false;
    }
    let enabled = normalize::flag(declared.enabled) == normalize::flag(remote.enabled);

    // Prometheus credentials are never echoed back.
    if declared.integration_type == PROMETHEUS {
        return enabled
            && same_str(declared.user_name.as_deref(), remote.user_name.as_deref())
            && same_str(
                declared.service_discovery.as_deref(),
                remote.service_discovery.as_deref(),
            );
    }

    let secrets = [
        (&declared.api_key, &remote.api_key),
        (&declared.api_token, &remote.api_token),
        (&declared.license_key, &remote.license_key),
        (&declared.password, &remote.password),
        (&declared.read_token, &remote.read_token),
        (&declared.routing_key, &remote.routing_key),
        (&declared.secret, &remote.secret),
        (&declared.service_key, &remote.service_key),
        (&declared.write_token, &remote.write_token),
        (
            &declared.microsoft_teams_webhook_url,
            &remote.microsoft_teams_webhook_url,
        ),
    ];
    let settings = [
        (&declared.account_id, &remote.account_id),
        (&declared.region, &remote.region),
        (&declared.team_name, &remote.team_name),
        (&declared.channel_name, &remote.channel_name),
        (&declared.url, &remote.url),
        (&declared.user_name, &remote.user_name),
        (&declared.service_discovery, &remote.service_discovery),
        (&declared.scheme, &remote.scheme),
    ];

    enabled
        && secrets
            .iter()
            .all(|(d, r)| same_secret(d.as_deref(), r.as_deref()))
        && settings
            .iter()
            .all(|(d, r)| same_str(d.as_deref(), r.as_deref()))
}

pub fn to_atlas(integration: &Integration) -> AtlasIntegration {
    let owned = |value: &Option<String>| non_empty_owned(value.clone());
    AtlasIntegration {
        integration_type: integration.integration_type.clone(),
        api_key: owned(&integration.api_key),
        api_token: owned(&integration.api_token),
        license_key: owned(&integration.license_key),
        password: owned(&integration.password),
        read_token: owned(&integration.read_token),
        routing_key: owned(&integration.routing_key),
        secret: owned(&integration.secret),
        service_key: owned(&integration.service_key),
        write_token: owned(&integration.write_token),
        account_id: owned(&integration.account_id),
        region: owned(&integration.region),
        team_name: owned(&integration.team_name),
        channel_name: owned(&integration.channel_name),
        url: owned(&integration.url),
        microsoft_teams_webhook_url: owned(&integration.microsoft_teams_webhook_url),
        user_name: owned(&integration.user_name),
        service_discovery: owned(&integration.service_discovery),
        scheme: owned(&integration.scheme),
        enabled: integration.enabled,
    }
}

fn status(integration_type: &str, state: ItemState, in_sync: bool) -> IntegrationStatus {
    IntegrationStatus {
        integration_type: integration_type.to_string(),
        state,
        in_sync,
        error_message: None,
    }
}

impl Family for Integrations {
    type Desired = Integration;
    type Observed = AtlasIntegration;

    fn key(&self, observed: &AtlasIntegration) -> String {
        observed.integration_type.clone()
    }

    fn matches(&self, observed: &AtlasIntegration, desired: &Integration) -> bool {
        observed.integration_type == desired.integration_type
    }

    fn needs_update(&self, observed: &AtlasIntegration, desired: &Integration) -> bool {
        !same_integration(desired, observed)
    }

    fn owns(&self, observed: &AtlasIntegration) -> bool {
        self.managed.contains(&observed.integration_type)
    }
}

#[async_trait]
impl Converge for Integrations {
    type Status = IntegrationStatus;

    fn name(&self) -> &'static str {
        "integrations"
    }

    fn validate(&self, desired: &Integration) -> Result<(), String> {
        if desired.integration_type.is_empty() {
            return Err("integration type must be specified".to_string());
        }
        Ok(())
    }

    async fn create(&self, desired: &Integration) -> Result<IntegrationStatus, ItemError> {
        self.client
            .create_integration(&self.project_id, &to_atlas(desired))
            .await
            .map_err(|e| {
                ItemError::step(
                    format!("failed to create integration {}", desired.integration_type),
                    e,
                )
            })?;
        Ok(status(&desired.integration_type, ItemState::Created, false))
    }

    async fn update(
        &self,
        _observed: &AtlasIntegration,
        desired: &Integration,
    ) -> Result<IntegrationStatus, ItemError> {
        self.client
            .replace_integration(&self.project_id, &to_atlas(desired))
            .await
            .map_err(|e| {
                ItemError::step(
                    format!("failed to update integration {}", desired.integration_type),
                    e,
                )
            })?;
        Ok(status(&desired.integration_type, ItemState::Updated, false))
    }

    async fn delete(&self, observed: &AtlasIntegration) -> Result<(), ItemError> {
        ignore_not_found(
            self.client
                .delete_integration(&self.project_id, &observed.integration_type)
                .await,
        )
        .map_err(|e| {
            ItemError::step(
                format!("failed to remove integration {}", observed.integration_type),
                e,
            )
        })
    }

    fn unchanged(&self, _observed: &AtlasIntegration, desired: &Integration) -> IntegrationStatus {
        status(&desired.integration_type, ItemState::Created, true)
    }

    fn failed(&self, desired: &Integration, stage: Stage, message: String) -> IntegrationStatus {
        IntegrationStatus {
            integration_type: desired.integration_type.clone(),
            state: stage.failed_state(),
            in_sync: false,
            error_message: Some(message),
        }
    }
}

fn prometheus_status(ctx: &Context, project_id: &str, desired: &[Integration]) -> Option<PrometheusStatus> {
    let prometheus = desired.iter().find(|i| i.integration_type == PROMETHEUS)?;
    Some(PrometheusStatus {
        scheme: Some(
            non_empty_owned(prometheus.scheme.clone()).unwrap_or_else(|| "https".to_string()),
        ),
        discovery_url: ctx.client().prometheus_discovery_url(project_id),
    })
}

/// Converge the project's third-party integrations.
pub async fn ensure_integrations(ctx: &mut Context, input: PassInput<'_>) -> Outcome {
    let condition = ConditionType::IntegrationReady;
    let desired = &input.spec.integrations;
    let client = ctx.client();

    let observed = match ctx.guard(client.list_integrations(input.project_id)).await {
        Ok(list) => list,
        Err(e) => {
            let outcome = Outcome::terminate(
                Reason::Integrations(IntegrationFailure::Internal),
                e.context("integrations", "list"),
            );
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };

    let allowed = protection::can_reconcile(
        input.protected,
        &input.last_applied.integrations,
        desired,
        &observed,
    );
    if let Some(blocked) = gate(ctx, condition, FEATURE, allowed) {
        return blocked;
    }

    let family = Integrations::new(client, input.project_id, &input.last_applied.integrations);
    let applied = match converge(ctx, &family, &observed, desired).await {
        Ok(applied) => applied,
        Err(e) => {
            let outcome =
                Outcome::terminate(Reason::Integrations(IntegrationFailure::Internal), e.to_string());
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };

    let outcome = match readiness::assess(&applied.statuses, desired.len()) {
        Readiness::Ready => Outcome::ok(),
        Readiness::InProgress => {
            Outcome::in_progress(Reason::Integrations(IntegrationFailure::InProgress), "in progress")
        }
        Readiness::Failed(message) => {
            Outcome::terminate(Reason::Integrations(IntegrationFailure::Request), message)
        }
    };
    ctx.ensure_status(StatusUpdate::Integrations(applied.statuses));
    let prometheus = prometheus_status(ctx, input.project_id, desired);
    ctx.ensure_status(StatusUpdate::Prometheus(prometheus));

    readiness::finish_family(ctx, condition, desired.len(), outcome, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datadog(api_key: &str) -> Integration {
        Integration {
            integration_type: "DATADOG".into(),
            api_key: Some(api_key.into()),
            region: Some("US".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_masked_secret_is_equal() {
        let remote = AtlasIntegration {
            integration_type: "DATADOG".into(),
            api_key: Some("****************cdef".into()),
            region: Some("US".into()),
            ..Default::default()
        };
        assert!(same_integration(&datadog("0123456789abcdef"), &remote));
        assert!(!same_integration(&datadog("0123456789abcxyz"), &remote));
    }

    #[test]
    fn test_setting_change_detected() {
        let mut remote = to_atlas(&datadog("0123456789abcdef"));
        remote.region = Some("EU".into());
        assert!(!same_integration(&datadog("0123456789abcdef"), &remote));
    }

    #[test]
    fn test_prometheus_ignores_password() {
        let declared = Integration {
            integration_type: PROMETHEUS.into(),
            user_name: Some("prom".into()),
            password: Some("secret-password".into()),
            service_discovery: Some("http".into()),
            enabled: Some(true),
            ..Default::default()
        };
        let remote = AtlasIntegration {
            integration_type: PROMETHEUS.into(),
            user_name: Some("prom".into()),
            service_discovery: Some("http".into()),
            enabled: Some(true),
            ..Default::default()
        };
        assert!(same_integration(&declared, &remote));

        let disabled = AtlasIntegration {
            enabled: Some(false),
            ..remote
        };
        assert!(!same_integration(&declared, &disabled));
    }
}
