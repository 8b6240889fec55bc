//! Resource families converged for a project.
//!
//! Every family follows the same pass shape: fetch observed state, consult the
//! deletion-protection gate, compute the diff, apply it, publish statuses and
//! derive the family condition from the aggregated readiness.

pub mod alert_configs;
pub mod cloud_integration;
pub mod custom_roles;
pub mod integrations;
pub mod network_peering;
pub mod teams;

pub use alert_configs::ensure_alert_configurations;
pub use cloud_integration::ensure_cloud_provider_integrations;
pub use custom_roles::ensure_custom_roles;
pub use integrations::ensure_integrations;
pub use network_peering::ensure_network_peers;
pub use teams::ensure_assigned_teams;

use crate::apply::{self, Applied, ApplyError, Converge};
use crate::diff;
use crate::project::ProjectSpec;
use crate::protection;
use crate::workflow::{ConditionType, Context, Outcome};

/// Read-only inputs shared by every family in one pass.
#[derive(Debug, Clone, Copy)]
pub struct PassInput<'a> {
    pub project_id: &'a str,
    pub org_id: &'a str,
    pub spec: &'a ProjectSpec,
    pub last_applied: &'a ProjectSpec,
    pub protected: bool,
    pub lookup_concurrency: usize,
}

/// Stop the family when the gate refuses; records the condition.
pub(crate) fn gate(
    ctx: &mut Context,
    condition: ConditionType,
    feature: &str,
    allowed: bool,
) -> Option<Outcome> {
    if allowed {
        return None;
    }
    tracing::info!(feature, "deletion protection blocked reconciliation");
    let outcome = protection::blocked_outcome(feature);
    ctx.set_condition_from_result(condition, &outcome);
    Some(outcome)
}

/// Diff and apply one family against the pass cancellation token.
pub(crate) async fn converge<F: Converge>(
    ctx: &Context,
    family: &F,
    observed: &[F::Observed],
    desired: &[F::Desired],
) -> Result<Applied<F::Status>, ApplyError> {
    let diff = diff::compute(family, observed, desired);
    tracing::debug!(
        family = family.name(),
        create = diff.create.len(),
        update = diff.changed_updates(),
        reauthorize = diff.reauthorize.len(),
        delete = diff.delete.len(),
        "computed diff"
    );
    apply::apply(family, diff, ctx.cancellation()).await
}

/// Treat "already gone" as a successful delete.
pub(crate) fn ignore_not_found(
    result: Result<(), crate::remote::RemoteError>,
) -> Result<(), crate::remote::RemoteError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}
