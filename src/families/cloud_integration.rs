//! Cloud provider access roles (IAM role trust between Atlas and AWS).
//!
//! A role is created remotely without an assumed-role ARN; the user then sets
//! up the trust relationship using the returned external id and declares the
//! ARN, at which point the role gets authorized. Remote roles without an ARN
//! are therefore placeholders that any unmatched declared role may claim.

use super::{converge, gate, ignore_not_found, PassInput};
use crate::apply::{Converge, DeletePolicy, ItemError, Stage};
use crate::diff::Family;
use crate::normalize::non_empty;
use crate::project::CloudProviderIntegration;
use crate::protection::{self, Identifiable};
use crate::readiness::{self, Readiness};
use crate::remote::{AtlasApi, AtlasCloudProviderRole};
use crate::status::{CloudProviderIntegrationStatus, FeatureUsageStatus, ItemState, StatusUpdate};
use crate::workflow::reason::CloudIntegrationFailure;
use crate::workflow::{ConditionType, Context, Outcome, Reason, Step};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const FEATURE: &str = "Cloud Provider Integrations";

fn reason(step: Option<Step>) -> Reason {
    Reason::CloudProviderIntegration(step.map_or(CloudIntegrationFailure::NotReady, Into::into))
}

pub const DEPRECATION_MESSAGE: &str = "The CloudProviderAccessRole has been deprecated, please move your configuration under CloudProviderIntegration.";

pub struct CloudIntegrations {
    client: Arc<dyn AtlasApi>,
    project_id: String,
}

impl CloudIntegrations {
    pub fn new(client: Arc<dyn AtlasApi>, project_id: &str) -> Self {
        Self {
            client,
            project_id: project_id.to_string(),
        }
    }

    async fn authorize(
        &self,
        observed: &AtlasCloudProviderRole,
        desired: &CloudProviderIntegration,
    ) -> Result<CloudProviderIntegrationStatus, ItemError> {
        let role_id = non_empty(observed.role_id.as_deref())
            .ok_or_else(|| ItemError::Invalid("cloud provider role has no id".to_string()))?;
        let body = AtlasCloudProviderRole {
            provider_name: desired.provider_name.clone(),
            iam_assumed_role_arn: Some(desired.iam_assumed_role_arn.clone()),
            ..Default::default()
        };
        let authorized = self
            .client
            .authorize_cloud_provider_role(&self.project_id, role_id, &body)
            .await
            .map_err(|e| ItemError::step("failed to authorize cloud provider role", e))?;

        tracing::info!(role_id = %role_id, provider = %desired.provider_name, "authorized cloud provider role");
        Ok(status_from(&authorized, desired))
    }
}

fn same_provider(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn feature_id(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Status of a remote role, with the ARN taken from the declared item.
fn status_from(
    role: &AtlasCloudProviderRole,
    desired: &CloudProviderIntegration,
) -> CloudProviderIntegrationStatus {
    let state = if role.authorized_date.is_some() {
        ItemState::Authorized
    } else {
        ItemState::Created
    };
    CloudProviderIntegrationStatus {
        provider_name: desired.provider_name.clone(),
        iam_assumed_role_arn: desired.iam_assumed_role_arn.clone(),
        role_id: role.role_id.clone(),
        atlas_aws_account_arn: role.atlas_aws_account_arn.clone(),
        atlas_assumed_role_external_id: role.atlas_assumed_role_external_id.clone(),
        created_date: role.created_date.clone(),
        authorized_date: role.authorized_date.clone(),
        feature_usages: role
            .feature_usages
            .iter()
            .map(|f| FeatureUsageStatus {
                feature_type: f.feature_type.clone().unwrap_or_default(),
                feature_id: feature_id(&f.feature_id),
            })
            .collect(),
        state,
        error_message: None,
    }
}

fn is_placeholder(role: &AtlasCloudProviderRole) -> bool {
    non_empty(role.iam_assumed_role_arn.as_deref()).is_none()
}

impl Identifiable for CloudProviderIntegration {
    fn identifier(&self) -> String {
        format!(
            "{}:{}",
            self.provider_name.to_ascii_uppercase(),
            self.iam_assumed_role_arn
        )
    }
}

impl Identifiable for AtlasCloudProviderRole {
    fn identifier(&self) -> String {
        format!(
            "{}:{}",
            self.provider_name.to_ascii_uppercase(),
            self.iam_assumed_role_arn.as_deref().unwrap_or_default()
        )
    }
}

impl Family for CloudIntegrations {
    type Desired = CloudProviderIntegration;
    type Observed = AtlasCloudProviderRole;

    fn key(&self, observed: &AtlasCloudProviderRole) -> String {
        observed
            .role_id
            .clone()
            .unwrap_or_else(|| observed.identifier())
    }

    fn matches(&self, observed: &AtlasCloudProviderRole, desired: &CloudProviderIntegration) -> bool {
        match non_empty(observed.iam_assumed_role_arn.as_deref()) {
            Some(arn) => {
                !desired.iam_assumed_role_arn.is_empty()
                    && arn == desired.iam_assumed_role_arn
                    && same_provider(&observed.provider_name, &desired.provider_name)
            }
            None => false,
        }
    }

    fn needs_update(&self, observed: &AtlasCloudProviderRole, desired: &CloudProviderIntegration) -> bool {
        observed.authorized_date.is_none() && !desired.iam_assumed_role_arn.is_empty()
    }

    fn is_placeholder(&self, observed: &AtlasCloudProviderRole) -> bool {
        is_placeholder(observed)
    }

    fn accepts_placeholder(&self, _desired: &CloudProviderIntegration) -> bool {
        true
    }
}

#[async_trait]
impl Converge for CloudIntegrations {
    type Status = CloudProviderIntegrationStatus;

    fn name(&self) -> &'static str {
        "cloud provider integrations"
    }

    fn validate(&self, desired: &CloudProviderIntegration) -> Result<(), String> {
        if desired.provider_name.is_empty() {
            return Err("providerName must be specified".to_string());
        }
        Ok(())
    }

    async fn create(
        &self,
        desired: &CloudProviderIntegration,
    ) -> Result<CloudProviderIntegrationStatus, ItemError> {
        let created = self
            .client
            .create_cloud_provider_role(&self.project_id, &desired.provider_name)
            .await
            .map_err(|e| ItemError::step("failed to create cloud provider role", e))?;
        let mut status = status_from(&created, desired);
        status.state = ItemState::Created;
        Ok(status)
    }

    async fn update(
        &self,
        observed: &AtlasCloudProviderRole,
        desired: &CloudProviderIntegration,
    ) -> Result<CloudProviderIntegrationStatus, ItemError> {
        self.authorize(observed, desired).await
    }

    /// A placeholder claimed by a declared role; authorized once the ARN is known.
    async fn reauthorize(
        &self,
        observed: &AtlasCloudProviderRole,
        desired: &CloudProviderIntegration,
    ) -> Result<CloudProviderIntegrationStatus, ItemError> {
        if desired.iam_assumed_role_arn.is_empty() {
            return Ok(status_from(observed, desired));
        }
        self.authorize(observed, desired).await
    }

    async fn delete(&self, observed: &AtlasCloudProviderRole) -> Result<(), ItemError> {
        let role_id = non_empty(observed.role_id.as_deref())
            .ok_or_else(|| ItemError::Invalid("cloud provider role has no id".to_string()))?;
        ignore_not_found(
            self.client
                .deauthorize_cloud_provider_role(&self.project_id, &observed.provider_name, role_id)
                .await,
        )
        .map_err(|e| ItemError::step("failed to deauthorize cloud provider role", e))
    }

    fn unchanged(
        &self,
        observed: &AtlasCloudProviderRole,
        desired: &CloudProviderIntegration,
    ) -> CloudProviderIntegrationStatus {
        status_from(observed, desired)
    }

    fn failed(
        &self,
        desired: &CloudProviderIntegration,
        stage: Stage,
        message: String,
    ) -> CloudProviderIntegrationStatus {
        CloudProviderIntegrationStatus {
            provider_name: desired.provider_name.clone(),
            iam_assumed_role_arn: desired.iam_assumed_role_arn.clone(),
            state: stage.failed_state(),
            error_message: Some(message),
            ..Default::default()
        }
    }

    fn delete_failed(
        &self,
        observed: &AtlasCloudProviderRole,
        message: String,
    ) -> Option<CloudProviderIntegrationStatus> {
        Some(CloudProviderIntegrationStatus {
            provider_name: observed.provider_name.clone(),
            iam_assumed_role_arn: observed.iam_assumed_role_arn.clone().unwrap_or_default(),
            role_id: observed.role_id.clone(),
            state: ItemState::FailedToDeauthorize,
            error_message: Some(message),
            ..Default::default()
        })
    }

    fn delete_policy(&self) -> DeletePolicy {
        DeletePolicy::Isolated
    }
}

/// Converge the project's cloud provider access roles.
pub async fn ensure_cloud_provider_integrations(ctx: &mut Context, input: PassInput<'_>) -> Outcome {
    let condition = ConditionType::CloudProviderIntegrationReady;
    let desired = input.spec.effective_cloud_provider_integrations();
    let client = ctx.client();

    let mut observed = match ctx
        .guard(client.list_cloud_provider_roles(input.project_id))
        .await
    {
        Ok(roles) => roles,
        Err(e) => {
            let outcome = Outcome::terminate(
                reason(Some(Step::Observe)),
                e.context("cloud provider roles", "list"),
            );
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };
    observed.sort_by(|a, b| a.role_id.cmp(&b.role_id));

    // Placeholders have no identity yet and never count as foreign state.
    let identified: Vec<String> = observed
        .iter()
        .filter(|r| !is_placeholder(r))
        .map(Identifiable::identifier)
        .collect();
    let allowed = protection::can_reconcile(
        input.protected,
        input.last_applied.effective_cloud_provider_integrations(),
        desired,
        &identified,
    );
    if let Some(blocked) = gate(ctx, condition, FEATURE, allowed) {
        return blocked;
    }

    let family = CloudIntegrations::new(client, input.project_id);
    let applied = match converge(ctx, &family, &observed, desired).await {
        Ok(applied) => applied,
        Err(e) => {
            let outcome = Outcome::terminate(reason(e.step()), e.to_string());
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };

    let outcome = match readiness::assess(&applied.statuses, desired.len()) {
        Readiness::Ready => Outcome::ok(),
        Readiness::InProgress => {
            Outcome::in_progress(reason(None), "not all entries are authorized")
        }
        Readiness::Failed(message) => {
            Outcome::terminate(reason(readiness::failed_step(&applied.statuses)), message)
        }
    };
    ctx.ensure_status(StatusUpdate::CloudProviderIntegrations(applied.statuses));

    let deprecated = !input.spec.cloud_provider_access_roles.is_empty();
    readiness::finish_family(
        ctx,
        condition,
        desired.len(),
        outcome,
        deprecated.then_some(DEPRECATION_MESSAGE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::types::FeatureUsage;
    use serde_json::json;

    fn remote(role_id: &str, arn: Option<&str>, authorized: bool) -> AtlasCloudProviderRole {
        AtlasCloudProviderRole {
            provider_name: "AWS".into(),
            role_id: Some(role_id.into()),
            iam_assumed_role_arn: arn.map(str::to_string),
            authorized_date: authorized.then(|| "2024-01-01T00:00:00Z".to_string()),
            ..Default::default()
        }
    }

    fn declared(arn: &str) -> CloudProviderIntegration {
        CloudProviderIntegration {
            provider_name: "AWS".into(),
            iam_assumed_role_arn: arn.into(),
        }
    }

    #[test]
    fn test_status_follows_authorized_date() {
        let created = status_from(&remote("r1", None, false), &declared("arn:a"));
        assert_eq!(created.state, ItemState::Created);
        assert_eq!(created.iam_assumed_role_arn, "arn:a");

        let authorized = status_from(&remote("r1", Some("arn:a"), true), &declared("arn:a"));
        assert_eq!(authorized.state, ItemState::Authorized);
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder(&remote("r1", None, false)));
        assert!(is_placeholder(&remote("r1", Some(""), false)));
        assert!(!is_placeholder(&remote("r1", Some("arn:a"), false)));
    }

    #[test]
    fn test_identity_ignores_provider_case() {
        let mut lower = declared("arn:a");
        lower.provider_name = "aws".into();
        assert_eq!(
            lower.identifier(),
            remote("r1", Some("arn:a"), true).identifier()
        );
    }

    #[test]
    fn test_feature_usage_ids_are_flattened() {
        let mut role = remote("r1", Some("arn:a"), true);
        role.feature_usages = vec![
            FeatureUsage {
                feature_type: Some("ATLAS_DATA_LAKE".into()),
                feature_id: Some(json!("lake-1")),
            },
            FeatureUsage {
                feature_type: Some("ENCRYPTION_AT_REST".into()),
                feature_id: Some(Value::Null),
            },
        ];
        let status = status_from(&role, &declared("arn:a"));
        assert_eq!(status.feature_usages[0].feature_id, "lake-1");
        assert_eq!(status.feature_usages[1].feature_id, "");
    }
}
