//! Readiness aggregation over per-item statuses.

use crate::status::{ItemState, ItemStatus};
use crate::workflow::{ConditionType, Context, Outcome, Reason, Step};

/// Verdict for one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    InProgress,
    /// Joined error messages of the failed items.
    Failed(String),
}

/// Ready iff every desired item has a status and all of them are ready.
pub fn assess<S: ItemStatus>(statuses: &[S], desired_count: usize) -> Readiness {
    if statuses.len() == desired_count && statuses.iter().all(ItemStatus::is_ready) {
        return Readiness::Ready;
    }

    let errors: Vec<&str> = statuses
        .iter()
        .filter_map(ItemStatus::error_message)
        .filter(|m| !m.is_empty())
        .collect();
    if errors.is_empty() {
        Readiness::InProgress
    } else {
        Readiness::Failed(errors.join("; "))
    }
}

/// Step every failed item stopped at, or `None` when they disagree or nothing failed.
pub fn failed_step<S: ItemStatus>(statuses: &[S]) -> Option<Step> {
    let mut steps = statuses.iter().filter_map(|s| match s.state() {
        ItemState::FailedToCreate => Some(Step::Create),
        ItemState::FailedToUpdate | ItemState::FailedToAuthorize => Some(Step::Update),
        ItemState::FailedToDeauthorize => Some(Step::Delete),
        _ => None,
    });
    let first = steps.next()?;
    steps.all(|step| step == first).then_some(first)
}

/// Fold statuses into an [`Outcome`].
///
/// `reason` maps the failed step to the family's reason; `None` stands for
/// "still converging" or failures spread over several steps.
pub fn aggregate<S, R>(statuses: &[S], desired_count: usize, reason: R) -> Outcome
where
    S: ItemStatus,
    R: Fn(Option<Step>) -> Reason,
{
    match assess(statuses, desired_count) {
        Readiness::Ready => Outcome::ok(),
        Readiness::InProgress => Outcome::in_progress(reason(None), "not all entries are ready"),
        Readiness::Failed(message) => Outcome::terminate(reason(failed_step(statuses)), message),
    }
}

/// Record a family's final condition.
///
/// Nothing desired and nothing wrong removes the condition entirely.
pub fn finish_family(
    ctx: &mut Context,
    condition: ConditionType,
    desired_count: usize,
    outcome: Outcome,
    true_message: Option<&str>,
) -> Outcome {
    if !outcome.is_ok() {
        ctx.set_condition_from_result(condition, &outcome);
        return outcome;
    }
    if desired_count == 0 {
        ctx.unset_condition(condition);
        return outcome;
    }
    match true_message {
        Some(message) => ctx.set_condition_true_msg(condition, message),
        None => ctx.set_condition_true(condition),
    }
    outcome
}
