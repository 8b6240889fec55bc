//! Project alert configurations.
//!
//! Alert configurations have no stable user-facing identity, so a remote
//! configuration matches a declared one only when their normalized content is
//! equal. Anything else on the remote side is deleted and recreated.

use super::{converge, ignore_not_found, PassInput};
use crate::apply::{Converge, ItemError, Stage};
use crate::diff::Family;
use crate::normalize::{self, non_empty, non_empty_owned, same_secret, same_set, same_str};
use crate::project::{AlertConfiguration, Matcher, MetricThreshold, Notification, Threshold};
use crate::readiness;
use crate::remote::{
    AtlasAlertConfig, AtlasApi, AtlasMetricThreshold, AtlasNotification, AtlasThreshold,
};
use crate::status::{AlertConfigurationStatus, ItemState, StatusUpdate};
use crate::workflow::reason::AlertConfigurationFailure;
use crate::workflow::{ConditionType, Context, Outcome, Reason, Step};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

fn reason(step: Option<Step>) -> Reason {
    Reason::AlertConfigurations(step.map_or(AlertConfigurationFailure::NotReady, Into::into))
}

pub struct AlertConfigurations {
    client: Arc<dyn AtlasApi>,
    project_id: String,
}

impl AlertConfigurations {
    pub fn new(client: Arc<dyn AtlasApi>, project_id: &str) -> Self {
        Self {
            client,
            project_id: project_id.to_string(),
        }
    }
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("failed to parse threshold value: {}. should be float", e))
}

/// A threshold with every field empty means "no threshold".
fn declared_threshold(threshold: &Option<Threshold>) -> Option<&Threshold> {
    threshold
        .as_ref()
        .filter(|t| !(t.operator.is_empty() && t.units.is_empty() && t.threshold.is_empty()))
}

fn declared_metric_threshold(threshold: &Option<MetricThreshold>) -> Option<&MetricThreshold> {
    threshold.as_ref().filter(|t| {
        !(t.metric_name.is_empty()
            && t.operator.is_empty()
            && t.threshold.is_empty()
            && t.units.is_empty()
            && t.mode.is_empty())
    })
}

fn remote_threshold(threshold: &Option<AtlasThreshold>) -> Option<&AtlasThreshold> {
    threshold.as_ref().filter(|t| {
        non_empty(t.operator.as_deref()).is_some()
            || non_empty(t.units.as_deref()).is_some()
            || t.threshold.is_some()
    })
}

fn remote_metric_threshold(threshold: &Option<AtlasMetricThreshold>) -> Option<&AtlasMetricThreshold> {
    threshold.as_ref().filter(|t| {
        !t.metric_name.is_empty()
            || non_empty(t.operator.as_deref()).is_some()
            || t.threshold.is_some()
            || non_empty(t.units.as_deref()).is_some()
            || non_empty(t.mode.as_deref()).is_some()
    })
}

fn same_threshold(declared: &Option<Threshold>, remote: &Option<AtlasThreshold>) -> bool {
    match (declared_threshold(declared), remote_threshold(remote)) {
        (None, None) => true,
        (Some(d), Some(r)) => {
            same_str(Some(d.operator.as_str()), r.operator.as_deref())
                && same_str(Some(d.units.as_str()), r.units.as_deref())
                && parse_threshold(&d.threshold).ok() == Some(r.threshold.unwrap_or_default())
        }
        _ => false,
    }
}

fn same_metric_threshold(
    declared: &Option<MetricThreshold>,
    remote: &Option<AtlasMetricThreshold>,
) -> bool {
    match (declared_metric_threshold(declared), remote_metric_threshold(remote)) {
        (None, None) => true,
        (Some(d), Some(r)) => {
            d.metric_name == r.metric_name
                && same_str(Some(d.operator.as_str()), r.operator.as_deref())
                && same_str(Some(d.units.as_str()), r.units.as_deref())
                && same_str(Some(d.mode.as_str()), r.mode.as_deref())
                && parse_threshold(&d.threshold).ok() == Some(r.threshold.unwrap_or_default())
        }
        _ => false,
    }
}

fn same_notification(declared: &Notification, remote: &AtlasNotification) -> bool {
    declared.type_name == remote.type_name
        && declared.interval_min.unwrap_or_default() == remote.interval_min.unwrap_or_default()
        && declared.delay_min.unwrap_or_default() == remote.delay_min.unwrap_or_default()
        && same_str(declared.email_address.as_deref(), remote.email_address.as_deref())
        && normalize::flag(declared.email_enabled) == normalize::flag(remote.email_enabled)
        && normalize::flag(declared.sms_enabled) == normalize::flag(remote.sms_enabled)
        && same_str(declared.mobile_number.as_deref(), remote.mobile_number.as_deref())
        && same_str(declared.channel_name.as_deref(), remote.channel_name.as_deref())
        && same_str(declared.team_id.as_deref(), remote.team_id.as_deref())
        && same_str(declared.username.as_deref(), remote.username.as_deref())
        && same_set(&declared.roles, &remote.roles)
        && same_secret(declared.api_token.as_deref(), remote.api_token.as_deref())
        && same_secret(declared.service_key.as_deref(), remote.service_key.as_deref())
        && same_secret(declared.datadog_api_key.as_deref(), remote.datadog_api_key.as_deref())
        && same_secret(
            declared.ops_genie_api_key.as_deref(),
            remote.ops_genie_api_key.as_deref(),
        )
}

/// Remote matchers arrive as free-form JSON.
fn remote_matchers(matchers: &[Value]) -> Vec<Matcher> {
    matchers
        .iter()
        .filter_map(|m| normalize::json_value(Some(m)))
        .filter_map(|m| serde_json::from_value::<Matcher>(m.clone()).ok())
        .collect()
}

/// Declared and remote configurations are interchangeable.
pub fn is_equal(declared: &AlertConfiguration, remote: &AtlasAlertConfig) -> bool {
    if declared.event_type_name != remote.event_type_name
        || declared.enabled != remote.enabled.unwrap_or(false)
        || !same_str(
            declared.severity_override.as_deref(),
            remote.severity_override.as_deref(),
        )
    {
        return false;
    }
    if !same_threshold(&declared.threshold, &remote.threshold)
        || !same_metric_threshold(&declared.metric_threshold, &remote.metric_threshold)
    {
        return false;
    }

    if declared.notifications.len() != remote.notifications.len()
        || !declared
            .notifications
            .iter()
            .all(|d| remote.notifications.iter().any(|r| same_notification(d, r)))
    {
        return false;
    }

    let matchers = remote_matchers(&remote.matchers);
    declared.matchers.len() == matchers.len()
        && declared.matchers.iter().all(|d| matchers.contains(d))
}

fn notification_to_atlas(n: &Notification) -> AtlasNotification {
    AtlasNotification {
        type_name: n.type_name.clone(),
        interval_min: n.interval_min,
        delay_min: n.delay_min,
        email_address: non_empty_owned(n.email_address.clone()),
        email_enabled: n.email_enabled,
        sms_enabled: n.sms_enabled,
        mobile_number: non_empty_owned(n.mobile_number.clone()),
        channel_name: non_empty_owned(n.channel_name.clone()),
        team_id: non_empty_owned(n.team_id.clone()),
        username: non_empty_owned(n.username.clone()),
        roles: n.roles.clone(),
        api_token: non_empty_owned(n.api_token.clone()),
        service_key: non_empty_owned(n.service_key.clone()),
        datadog_api_key: non_empty_owned(n.datadog_api_key.clone()),
        ops_genie_api_key: non_empty_owned(n.ops_genie_api_key.clone()),
    }
}

/// Wire body for a declared configuration; fails on unparsable thresholds.
pub fn to_atlas(config: &AlertConfiguration) -> Result<AtlasAlertConfig, String> {
    let threshold = match declared_threshold(&config.threshold) {
        Some(t) => Some(AtlasThreshold {
            operator: non_empty_owned(Some(t.operator.clone())),
            units: non_empty_owned(Some(t.units.clone())),
            threshold: Some(parse_threshold(&t.threshold)?),
        }),
        None => None,
    };
    let metric_threshold = match declared_metric_threshold(&config.metric_threshold) {
        Some(t) => Some(AtlasMetricThreshold {
            metric_name: t.metric_name.clone(),
            operator: non_empty_owned(Some(t.operator.clone())),
            threshold: Some(parse_threshold(&t.threshold)?),
            units: non_empty_owned(Some(t.units.clone())),
            mode: non_empty_owned(Some(t.mode.clone())),
        }),
        None => None,
    };
    let matchers = config
        .matchers
        .iter()
        .map(|m| serde_json::to_value(m).map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AtlasAlertConfig {
        event_type_name: config.event_type_name.clone(),
        enabled: Some(config.enabled),
        severity_override: non_empty_owned(config.severity_override.clone()),
        threshold,
        metric_threshold,
        notifications: config.notifications.iter().map(notification_to_atlas).collect(),
        matchers,
        ..Default::default()
    })
}

fn status_from(remote: &AtlasAlertConfig) -> AlertConfigurationStatus {
    AlertConfigurationStatus {
        id: remote.id.clone(),
        event_type_name: remote.event_type_name.clone(),
        enabled: remote.enabled,
        created: remote.created.clone(),
        updated: remote.updated.clone(),
        state: ItemState::Created,
        error_message: None,
    }
}

impl Family for AlertConfigurations {
    type Desired = AlertConfiguration;
    type Observed = AtlasAlertConfig;

    fn key(&self, observed: &AtlasAlertConfig) -> String {
        observed
            .id
            .clone()
            .unwrap_or_else(|| observed.event_type_name.clone())
    }

    fn matches(&self, observed: &AtlasAlertConfig, desired: &AlertConfiguration) -> bool {
        is_equal(desired, observed)
    }
}

#[async_trait]
impl Converge for AlertConfigurations {
    type Status = AlertConfigurationStatus;

    fn name(&self) -> &'static str {
        "alert configurations"
    }

    fn validate(&self, desired: &AlertConfiguration) -> Result<(), String> {
        to_atlas(desired)
            .map(|_| ())
            .map_err(|e| format!("failed to parse atlas alert configuration: {}", e))
    }

    async fn create(
        &self,
        desired: &AlertConfiguration,
    ) -> Result<AlertConfigurationStatus, ItemError> {
        let body = to_atlas(desired).map_err(ItemError::Invalid)?;
        let created = self
            .client
            .create_alert_config(&self.project_id, &body)
            .await
            .map_err(|e| ItemError::step("failed to create alert configuration", e))?;
        Ok(status_from(&created))
    }

    /// Content is the identity, so a matched pair never changes.
    async fn update(
        &self,
        observed: &AtlasAlertConfig,
        desired: &AlertConfiguration,
    ) -> Result<AlertConfigurationStatus, ItemError> {
        Ok(self.unchanged(observed, desired))
    }

    async fn delete(&self, observed: &AtlasAlertConfig) -> Result<(), ItemError> {
        let id = non_empty(observed.id.as_deref())
            .ok_or_else(|| ItemError::Invalid("alert configuration has no id".to_string()))?;
        ignore_not_found(self.client.delete_alert_config(&self.project_id, id).await)?;
        Ok(())
    }

    fn unchanged(
        &self,
        observed: &AtlasAlertConfig,
        _desired: &AlertConfiguration,
    ) -> AlertConfigurationStatus {
        status_from(observed)
    }

    fn failed(
        &self,
        desired: &AlertConfiguration,
        stage: Stage,
        message: String,
    ) -> AlertConfigurationStatus {
        AlertConfigurationStatus {
            event_type_name: desired.event_type_name.clone(),
            enabled: Some(desired.enabled),
            state: stage.failed_state(),
            error_message: Some(message),
            ..Default::default()
        }
    }
}

/// Converge alert configurations when the project opts into syncing them.
pub async fn ensure_alert_configurations(ctx: &mut Context, input: PassInput<'_>) -> Outcome {
    let condition = ConditionType::AlertConfigurationReady;
    let desired = &input.spec.alert_configurations;

    if !input.spec.alert_configuration_sync_enabled || desired.is_empty() {
        ctx.unset_condition(condition);
        return Outcome::ok();
    }

    let client = ctx.client();
    let observed = match ctx.guard(client.list_alert_configs(input.project_id)).await {
        Ok(configs) => configs,
        Err(e) => {
            let outcome = Outcome::terminate(
                reason(Some(Step::Observe)),
                e.context("alert configurations", "list"),
            );
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };

    let family = AlertConfigurations::new(client, input.project_id);
    let applied = match converge(ctx, &family, &observed, desired).await {
        Ok(applied) => applied,
        Err(e) => {
            let outcome = Outcome::terminate(reason(e.step()), e.to_string());
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };

    let outcome = readiness::aggregate(&applied.statuses, desired.len(), reason);
    ctx.ensure_status(StatusUpdate::AlertConfigurations(applied.statuses));
    readiness::finish_family(ctx, condition, desired.len(), outcome, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn declared() -> AlertConfiguration {
        AlertConfiguration {
            enabled: true,
            event_type_name: "REPLICATION_OPLOG_WINDOW_RUNNING_OUT".into(),
            threshold: Some(Threshold {
                operator: "LESS_THAN".into(),
                units: "HOURS".into(),
                threshold: "1".into(),
            }),
            matchers: vec![Matcher {
                field_name: "HOSTNAME_AND_PORT".into(),
                operator: "EQUALS".into(),
                value: "host:27017".into(),
            }],
            notifications: vec![Notification {
                type_name: "GROUP".into(),
                interval_min: Some(5),
                delay_min: Some(0),
                roles: vec!["GROUP_OWNER".into(), "GROUP_READ_ONLY".into()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn remote() -> AtlasAlertConfig {
        AtlasAlertConfig {
            id: Some("a1".into()),
            event_type_name: "REPLICATION_OPLOG_WINDOW_RUNNING_OUT".into(),
            enabled: Some(true),
            threshold: Some(AtlasThreshold {
                operator: Some("LESS_THAN".into()),
                units: Some("HOURS".into()),
                threshold: Some(1.0),
            }),
            matchers: vec![json!({
                "fieldName": "HOSTNAME_AND_PORT",
                "operator": "EQUALS",
                "value": "host:27017"
            })],
            notifications: vec![AtlasNotification {
                type_name: "GROUP".into(),
                interval_min: Some(5),
                roles: vec!["GROUP_READ_ONLY".into(), "GROUP_OWNER".into()],
                sms_enabled: Some(false),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_equal_after_normalization() {
        assert!(is_equal(&declared(), &remote()));
    }

    #[test]
    fn test_threshold_difference_detected() {
        let mut changed = remote();
        changed.threshold = Some(AtlasThreshold {
            operator: Some("LESS_THAN".into()),
            units: Some("HOURS".into()),
            threshold: Some(2.0),
        });
        assert!(!is_equal(&declared(), &changed));
    }

    #[test]
    fn test_missing_remote_enabled_is_disabled() {
        let mut remote = remote();
        remote.enabled = None;
        assert!(!is_equal(&declared(), &remote));
    }

    #[test]
    fn test_empty_threshold_object_is_absent() {
        let mut declared = declared();
        declared.threshold = Some(Threshold::default());
        let mut remote = remote();
        remote.threshold = Some(AtlasThreshold::default());
        assert!(is_equal(&declared, &remote));
    }

    #[test]
    fn test_null_matchers_are_ignored() {
        let mut declared = declared();
        declared.matchers.clear();
        let mut remote = remote();
        remote.matchers = vec![Value::Null];
        assert!(is_equal(&declared, &remote));
    }

    #[test]
    fn test_unparsable_threshold_fails_conversion() {
        let mut declared = declared();
        declared.threshold = Some(Threshold {
            operator: "LESS_THAN".into(),
            units: "HOURS".into(),
            threshold: "one".into(),
        });
        let err = to_atlas(&declared).unwrap_err();
        assert!(err.starts_with("failed to parse threshold value"));
        assert!(!is_equal(&declared, &remote()));
    }

    #[test]
    fn test_conversion_keeps_matchers_and_notifications() {
        let wire = to_atlas(&declared()).unwrap();
        assert_eq!(wire.threshold.unwrap().threshold, Some(1.0));
        assert_eq!(wire.matchers[0]["fieldName"], "HOSTNAME_AND_PORT");
        assert_eq!(wire.notifications[0].interval_min, Some(5));
    }
}
