//! Custom database roles.

use super::{converge, gate, ignore_not_found, PassInput};
use crate::apply::{Converge, ItemError, Stage};
use crate::diff::Family;
use crate::normalize;
use crate::project::{Action, CustomRole, InheritedRole, Resource};
use crate::protection::{self, Identifiable};
use crate::readiness;
use crate::remote::{AtlasAction, AtlasApi, AtlasCustomRole, AtlasInheritedRole, AtlasResource};
use crate::status::{CustomRoleStatus, ItemState, StatusUpdate};
use crate::workflow::reason::CustomRoleFailure;
use crate::workflow::{ConditionType, Context, Outcome, Reason, Step};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

const FEATURE: &str = "Custom Roles";

fn reason(step: Option<Step>) -> Reason {
    Reason::CustomRoles(step.map_or(CustomRoleFailure::NotReady, Into::into))
}

pub struct CustomRoles {
    client: Arc<dyn AtlasApi>,
    project_id: String,
    /// Role names applied by an earlier pass; only these may be deleted.
    managed: HashSet<String>,
}

impl CustomRoles {
    pub fn new(client: Arc<dyn AtlasApi>, project_id: &str, previously_applied: &[CustomRole]) -> Self {
        Self {
            client,
            project_id: project_id.to_string(),
            managed: previously_applied.iter().map(|r| r.name.clone()).collect(),
        }
    }
}

impl Identifiable for CustomRole {
    fn identifier(&self) -> String {
        self.name.clone()
    }
}

/// Collapse empty-vs-absent so remote and declared roles compare equal.
fn normalized(role: &CustomRole) -> CustomRole {
    CustomRole {
        name: role.name.clone(),
        inherited_roles: role.inherited_roles.clone(),
        actions: role
            .actions
            .iter()
            .map(|action| Action {
                name: action.name.clone(),
                resources: action
                    .resources
                    .iter()
                    .map(|r| Resource {
                        cluster: normalize::flag(r.cluster),
                        database: normalize::non_empty_owned(r.database.clone()),
                        collection: normalize::non_empty_owned(r.collection.clone()),
                    })
                    .collect(),
            })
            .collect(),
    }
}

pub fn from_atlas(role: &AtlasCustomRole) -> CustomRole {
    CustomRole {
        name: role.role_name.clone(),
        inherited_roles: role
            .inherited_roles
            .iter()
            .map(|r| InheritedRole {
                name: r.role.clone(),
                database: r.db.clone(),
            })
            .collect(),
        actions: role
            .actions
            .iter()
            .map(|a| Action {
                name: a.action.clone(),
                resources: a
                    .resources
                    .iter()
                    .map(|r| Resource {
                        cluster: r.cluster,
                        database: r.db.clone(),
                        collection: r.collection.clone(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

pub fn to_atlas(role: &CustomRole) -> AtlasCustomRole {
    AtlasCustomRole {
        role_name: role.name.clone(),
        inherited_roles: role
            .inherited_roles
            .iter()
            .map(|r| AtlasInheritedRole {
                role: r.name.clone(),
                db: r.database.clone(),
            })
            .collect(),
        actions: role
            .actions
            .iter()
            .map(|a| AtlasAction {
                action: a.name.clone(),
                resources: a
                    .resources
                    .iter()
                    .map(|r| AtlasResource {
                        cluster: normalize::flag(r.cluster),
                        db: normalize::non_empty_owned(r.database.clone()),
                        collection: normalize::non_empty_owned(r.collection.clone()),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn status(name: &str, state: ItemState) -> CustomRoleStatus {
    CustomRoleStatus {
        name: name.to_string(),
        state,
        error_message: None,
    }
}

impl Family for CustomRoles {
    type Desired = CustomRole;
    type Observed = CustomRole;

    fn key(&self, observed: &CustomRole) -> String {
        observed.name.clone()
    }

    fn matches(&self, observed: &CustomRole, desired: &CustomRole) -> bool {
        observed.name == desired.name
    }

    fn needs_update(&self, observed: &CustomRole, desired: &CustomRole) -> bool {
        normalized(observed) != normalized(desired)
    }

    fn owns(&self, observed: &CustomRole) -> bool {
        self.managed.contains(&observed.name)
    }
}

#[async_trait]
impl Converge for CustomRoles {
    type Status = CustomRoleStatus;

    fn name(&self) -> &'static str {
        "custom roles"
    }

    fn validate(&self, desired: &CustomRole) -> Result<(), String> {
        if desired.name.is_empty() {
            return Err("roleName must be specified".to_string());
        }
        Ok(())
    }

    async fn create(&self, desired: &CustomRole) -> Result<CustomRoleStatus, ItemError> {
        self.client
            .create_custom_role(&self.project_id, &to_atlas(desired))
            .await
            .map_err(|e| ItemError::step(format!("failed to create custom role '{}'", desired.name), e))?;
        Ok(status(&desired.name, ItemState::Created))
    }

    async fn update(
        &self,
        _observed: &CustomRole,
        desired: &CustomRole,
    ) -> Result<CustomRoleStatus, ItemError> {
        let mut body = to_atlas(desired);
        body.role_name.clear();
        self.client
            .update_custom_role(&self.project_id, &desired.name, &body)
            .await
            .map_err(|e| ItemError::step(format!("failed to update custom role '{}'", desired.name), e))?;
        Ok(status(&desired.name, ItemState::Updated))
    }

    async fn delete(&self, observed: &CustomRole) -> Result<(), ItemError> {
        ignore_not_found(
            self.client
                .delete_custom_role(&self.project_id, &observed.name)
                .await,
        )?;
        Ok(())
    }

    fn unchanged(&self, _observed: &CustomRole, desired: &CustomRole) -> CustomRoleStatus {
        status(&desired.name, ItemState::Created)
    }

    fn failed(&self, desired: &CustomRole, stage: Stage, message: String) -> CustomRoleStatus {
        CustomRoleStatus {
            name: desired.name.clone(),
            state: stage.failed_state(),
            error_message: Some(message),
        }
    }
}

/// Converge the project's custom roles.
pub async fn ensure_custom_roles(ctx: &mut Context, input: PassInput<'_>) -> Outcome {
    let condition = ConditionType::CustomRolesReady;
    let desired = &input.spec.custom_roles;
    let client = ctx.client();

    let observed: Vec<CustomRole> = match ctx.guard(client.list_custom_roles(input.project_id)).await {
        Ok(roles) => roles.iter().map(from_atlas).collect(),
        Err(e) => {
            let outcome = Outcome::terminate(
                reason(Some(Step::Observe)),
                e.context("custom roles", "list"),
            );
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };

    let allowed = protection::can_reconcile(
        input.protected,
        &input.last_applied.custom_roles,
        desired,
        &observed,
    );
    if let Some(blocked) = gate(ctx, condition, FEATURE, allowed) {
        return blocked;
    }

    let family = CustomRoles::new(client, input.project_id, &input.last_applied.custom_roles);
    let applied = match converge(ctx, &family, &observed, desired).await {
        Ok(applied) => applied,
        Err(e) => {
            let outcome = Outcome::terminate(reason(e.step()), e.to_string());
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };

    let outcome = readiness::aggregate(&applied.statuses, desired.len(), reason);
    ctx.ensure_status(StatusUpdate::CustomRoles(applied.statuses));
    readiness::finish_family(ctx, condition, desired.len(), outcome, None)
}
