//! Organization teams assigned to the project.
//!
//! Teams are declared by name but assigned by id, so every pass first
//! resolves names through the organization. A role change is applied by
//! removing the team and assigning it again.

use super::{converge, gate, ignore_not_found, PassInput};
use crate::apply::{Converge, ItemError, Stage};
use crate::diff::Family;
use crate::normalize::same_set;
use crate::project::TeamAssignment;
use crate::protection::{self, Identifiable};
use crate::readiness;
use crate::remote::{AtlasApi, AtlasAssignedTeam, RemoteError};
use crate::status::{ItemState, StatusUpdate, TeamStatus};
use crate::workflow::reason::TeamFailure;
use crate::workflow::{ConditionType, Context, Outcome, Reason};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

const REASON: Reason = Reason::Teams(TeamFailure::Unavailable);
const FEATURE: &str = "Teams";

/// A declared assignment whose team name resolved to an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTeam {
    pub team_name: String,
    pub team_id: String,
    pub roles: Vec<String>,
}

fn role_identity(team_id: &str, roles: &[String]) -> String {
    let mut sorted: Vec<&str> = roles.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    format!("{}:{}", team_id, sorted.join(","))
}

impl Identifiable for ResolvedTeam {
    fn identifier(&self) -> String {
        role_identity(&self.team_id, &self.roles)
    }
}

impl Identifiable for AtlasAssignedTeam {
    fn identifier(&self) -> String {
        role_identity(&self.team_id, &self.role_names)
    }
}

/// Resolve team names to ids, at most `concurrency` lookups in flight.
///
/// Unknown names map to `None`; any other lookup error aborts.
pub async fn resolve_team_ids(
    client: Arc<dyn AtlasApi>,
    org_id: &str,
    names: BTreeSet<String>,
    concurrency: usize,
) -> Result<HashMap<String, Option<String>>, RemoteError> {
    let mut lookups = stream::iter(names.into_iter().map(|name| {
        let client = Arc::clone(&client);
        async move {
            match client.get_team_by_name(org_id, &name).await {
                Ok(team) => Ok((name, Some(team.id))),
                Err(e) if e.is_not_found() => Ok((name, None)),
                Err(e) => Err(e),
            }
        }
    }))
    .buffer_unordered(concurrency.max(1));

    let mut resolved = HashMap::new();
    while let Some(lookup) = lookups.next().await {
        let (name, id) = lookup?;
        resolved.insert(name, id);
    }
    Ok(resolved)
}

fn resolve(assignments: &[TeamAssignment], ids: &HashMap<String, Option<String>>) -> Vec<ResolvedTeam> {
    assignments
        .iter()
        .filter_map(|a| {
            let id = ids.get(&a.team_name)?.as_ref()?;
            Some(ResolvedTeam {
                team_name: a.team_name.clone(),
                team_id: id.clone(),
                roles: a.roles.clone(),
            })
        })
        .collect()
}

pub struct AssignedTeams {
    client: Arc<dyn AtlasApi>,
    project_id: String,
}

impl AssignedTeams {
    pub fn new(client: Arc<dyn AtlasApi>, project_id: &str) -> Self {
        Self {
            client,
            project_id: project_id.to_string(),
        }
    }

    async fn assign(&self, desired: &ResolvedTeam) -> Result<(), RemoteError> {
        let team = AtlasAssignedTeam {
            team_id: desired.team_id.clone(),
            role_names: desired.roles.clone(),
        };
        self.client
            .add_teams(&self.project_id, std::slice::from_ref(&team))
            .await
    }
}

fn status(desired: &ResolvedTeam, state: ItemState) -> TeamStatus {
    TeamStatus {
        team_name: desired.team_name.clone(),
        team_id: Some(desired.team_id.clone()),
        state,
        error_message: None,
    }
}

impl Family for AssignedTeams {
    type Desired = ResolvedTeam;
    type Observed = AtlasAssignedTeam;

    fn key(&self, observed: &AtlasAssignedTeam) -> String {
        observed.team_id.clone()
    }

    fn matches(&self, observed: &AtlasAssignedTeam, desired: &ResolvedTeam) -> bool {
        observed.team_id == desired.team_id
    }

    fn needs_update(&self, observed: &AtlasAssignedTeam, desired: &ResolvedTeam) -> bool {
        !same_set(&observed.role_names, &desired.roles)
    }
}

#[async_trait]
impl Converge for AssignedTeams {
    type Status = TeamStatus;

    fn name(&self) -> &'static str {
        "teams"
    }

    fn validate(&self, desired: &ResolvedTeam) -> Result<(), String> {
        if desired.roles.is_empty() {
            return Err(format!("team '{}' must be assigned at least one role", desired.team_name));
        }
        Ok(())
    }

    async fn create(&self, desired: &ResolvedTeam) -> Result<TeamStatus, ItemError> {
        self.assign(desired).await.map_err(|e| {
            ItemError::step(format!("failed to assign team {}", desired.team_name), e)
        })?;
        Ok(status(desired, ItemState::Created))
    }

    async fn update(
        &self,
        observed: &AtlasAssignedTeam,
        desired: &ResolvedTeam,
    ) -> Result<TeamStatus, ItemError> {
        tracing::debug!(team_id = %observed.team_id, "removing team from project for later update");
        ignore_not_found(
            self.client
                .remove_team(&self.project_id, &observed.team_id)
                .await,
        )
        .map_err(|e| ItemError::step(format!("failed to remove team {}", desired.team_name), e))?;
        self.assign(desired).await.map_err(|e| {
            ItemError::step(format!("failed to assign team {}", desired.team_name), e)
        })?;
        Ok(status(desired, ItemState::Updated))
    }

    async fn delete(&self, observed: &AtlasAssignedTeam) -> Result<(), ItemError> {
        ignore_not_found(
            self.client
                .remove_team(&self.project_id, &observed.team_id)
                .await,
        )
        .map_err(ItemError::Remote)
    }

    fn unchanged(&self, _observed: &AtlasAssignedTeam, desired: &ResolvedTeam) -> TeamStatus {
        status(desired, ItemState::Created)
    }

    fn failed(&self, desired: &ResolvedTeam, stage: Stage, message: String) -> TeamStatus {
        TeamStatus {
            team_name: desired.team_name.clone(),
            team_id: Some(desired.team_id.clone()),
            state: stage.failed_state(),
            error_message: Some(message),
        }
    }
}

/// Converge the teams assigned to the project.
pub async fn ensure_assigned_teams(ctx: &mut Context, input: PassInput<'_>) -> Outcome {
    let condition = ConditionType::ProjectTeamsReady;
    let declared = &input.spec.teams;
    let client = ctx.client();

    let observed: Vec<AtlasAssignedTeam> =
        match ctx.guard(client.list_assigned_teams(input.project_id)).await {
            Ok(list) => list.into_iter().filter(|t| !t.team_id.is_empty()).collect(),
            Err(e) => {
                let outcome = Outcome::terminate(REASON, e.context("teams", "list"));
                ctx.set_condition_from_result(condition, &outcome);
                return outcome;
            }
        };

    let names: BTreeSet<String> = declared
        .iter()
        .chain(input.last_applied.teams.iter())
        .map(|t| t.team_name.clone())
        .filter(|name| !name.is_empty())
        .collect();
    let lookup = resolve_team_ids(
        Arc::clone(&client),
        input.org_id,
        names,
        input.lookup_concurrency,
    );
    let ids = match ctx.guard(lookup).await {
        Ok(ids) => ids,
        Err(e) => {
            let outcome = Outcome::terminate(REASON, e.context("teams", "resolve"));
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };

    let desired = resolve(declared, &ids);
    let previously_applied = resolve(&input.last_applied.teams, &ids);

    let allowed = protection::can_reconcile(input.protected, &previously_applied, &desired, &observed);
    if let Some(blocked) = gate(ctx, condition, FEATURE, allowed) {
        return blocked;
    }

    let family = AssignedTeams::new(client, input.project_id);
    let applied = match converge(ctx, &family, &observed, &desired).await {
        Ok(applied) => applied,
        Err(e) => {
            let outcome = Outcome::terminate(REASON, e.to_string());
            ctx.set_condition_from_result(condition, &outcome);
            return outcome;
        }
    };

    // Declaration order, unknown names included as failures.
    let mut resolved_statuses = applied.statuses.into_iter();
    let statuses: Vec<TeamStatus> = declared
        .iter()
        .filter_map(|assignment| match ids.get(&assignment.team_name) {
            Some(Some(_)) => resolved_statuses.next(),
            _ => {
                tracing::warn!(team = %assignment.team_name, "team not found, skipping assignment");
                Some(TeamStatus {
                    team_name: assignment.team_name.clone(),
                    team_id: None,
                    state: ItemState::FailedToCreate,
                    error_message: Some(format!("team '{}' not found", assignment.team_name)),
                })
            }
        })
        .collect();

    let outcome = readiness::aggregate(&statuses, declared.len(), |_| REASON);
    ctx.ensure_status(StatusUpdate::Teams(statuses));
    readiness::finish_family(ctx, condition, declared.len(), outcome, None)
}
