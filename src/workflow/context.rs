//! Pass-scoped reconciliation context.

use super::condition::{Condition, ConditionStatus, ConditionType, Conditions};
use super::result::Outcome;
use crate::remote::{AtlasApi, RemoteError};
use crate::status::StatusUpdate;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Span;
use uuid::Uuid;

/// Mutable state owned by exactly one reconciliation pass.
///
/// Built at the start of a pass, threaded by `&mut` through every family, and
/// consumed by [`Context::finish`]. It is never shared between tasks.
pub struct Context {
    pass_id: Uuid,
    span: Span,
    client: Arc<dyn AtlasApi>,
    cancel: CancellationToken,
    conditions: Conditions,
    status_updates: Vec<StatusUpdate>,
}

/// Everything a pass produced for the status collaborator.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub conditions: Conditions,
    pub status_updates: Vec<StatusUpdate>,
}

impl Context {
    pub fn new(client: Arc<dyn AtlasApi>, cancel: CancellationToken, span: Span) -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            span,
            client,
            cancel,
            conditions: Conditions::new(),
            status_updates: Vec::new(),
        }
    }

    /// Start from the conditions persisted by an earlier pass.
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn pass_id(&self) -> Uuid {
        self.pass_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn client(&self) -> Arc<dyn AtlasApi> {
        Arc::clone(&self.client)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Race a remote call against pass cancellation.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        guarded(&self.cancel, fut).await
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    fn set(&mut self, condition: Condition) {
        self.conditions.set(condition);
    }

    pub fn set_condition_true(&mut self, condition_type: ConditionType) {
        self.set(Condition::new(condition_type, ConditionStatus::True));
    }

    pub fn set_condition_true_msg(&mut self, condition_type: ConditionType, message: &str) {
        self.set(Condition::new(condition_type, ConditionStatus::True).with_message(message));
    }

    pub fn set_condition_false(&mut self, condition_type: ConditionType) {
        self.set(Condition::new(condition_type, ConditionStatus::False));
    }

    pub fn unset_condition(&mut self, condition_type: ConditionType) {
        self.conditions.unset(condition_type);
    }

    /// Derive a condition from an outcome: `True` iff the outcome is ok.
    pub fn set_condition_from_result(&mut self, condition_type: ConditionType, outcome: &Outcome) {
        let status = if outcome.is_ok() {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        };
        let mut condition = Condition::new(condition_type, status).with_message(outcome.message());
        if let Some(reason) = outcome.reason() {
            condition = condition.with_reason(reason.as_str());
        }

        if !outcome.is_ok() {
            let _entered = self.span.enter();
            if outcome.is_warning() {
                tracing::debug!(
                    condition = %condition_type,
                    reason = condition.reason.as_deref().unwrap_or_default(),
                    message = outcome.message(),
                    "condition not ready"
                );
            } else {
                tracing::warn!(
                    condition = %condition_type,
                    reason = condition.reason.as_deref().unwrap_or_default(),
                    message = outcome.message(),
                    "condition failed"
                );
            }
        }
        self.set(condition);
    }

    /// Queue a status change; a later update for the same slot replaces it.
    pub fn ensure_status(&mut self, update: StatusUpdate) {
        let slot = update.slot();
        self.status_updates.retain(|u| u.slot() != slot);
        self.status_updates.push(update);
    }

    pub fn status_updates(&self) -> &[StatusUpdate] {
        &self.status_updates
    }

    pub fn finish(self) -> PassReport {
        PassReport {
            pass_id: self.pass_id,
            conditions: self.conditions,
            status_updates: self.status_updates,
        }
    }
}

/// Free-standing form of [`Context::guard`] for code that only holds the token.
pub async fn guarded<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RemoteError::Cancelled),
        result = fut => result,
    }
}
