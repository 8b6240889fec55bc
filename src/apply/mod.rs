//! Convergence applier.
//!
//! Executes a [`Diff`] against the remote API:
//! - deletes first, to free identity slots for creates
//! - validation + create, update and reauthorize with per-item isolation
//! - auxiliary cleanup once the surviving statuses are known
//!
//! Per-item failures become failed status records. Only a fail-fast delete,
//! a cleanup failure or cancellation abort the whole family.

use crate::diff::{Diff, Family};
use crate::remote::RemoteError;
use crate::status::{ItemState, ItemStatus};
use crate::workflow::Step;
use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Failure of one remote step for one item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("{context}: {source}")]
    Step {
        context: String,
        #[source]
        source: RemoteError,
    },

    #[error("{0}")]
    Invalid(String),
}

impl ItemError {
    pub fn step(context: impl Into<String>, source: RemoteError) -> Self {
        ItemError::Step {
            context: context.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ItemError::Remote(RemoteError::Cancelled)
                | ItemError::Step {
                    source: RemoteError::Cancelled,
                    ..
                }
        )
    }
}

/// Family-level abort.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("failed to delete {family} '{key}': {source}")]
    Delete {
        family: &'static str,
        key: String,
        #[source]
        source: ItemError,
    },

    #[error("failed to clean up {family}: {source}")]
    Cleanup {
        family: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl ApplyError {
    /// Cancellation has no failed step.
    pub fn step(&self) -> Option<Step> {
        match self {
            ApplyError::Delete { .. } | ApplyError::Cleanup { .. } => Some(Step::Delete),
            ApplyError::Cancelled => None,
        }
    }
}

/// Step at which an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Create,
    Update,
    Authorize,
}

impl Stage {
    pub fn failed_state(&self) -> ItemState {
        match self {
            Stage::Validate | Stage::Create => ItemState::FailedToCreate,
            Stage::Update => ItemState::FailedToUpdate,
            Stage::Authorize => ItemState::FailedToAuthorize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// First delete error aborts the family for this pass.
    #[default]
    FailFast,
    /// Delete errors are recorded and the remaining work continues.
    Isolated,
}

/// Remote side effects of one resource family.
#[async_trait]
pub trait Converge: Family + Send + Sync {
    type Status: ItemStatus + Clone + Send + Sync;

    /// Family name for logs, metrics and error messages.
    fn name(&self) -> &'static str;

    fn validate(&self, _desired: &Self::Desired) -> Result<(), String> {
        Ok(())
    }

    async fn create(&self, desired: &Self::Desired) -> Result<Self::Status, ItemError>;

    async fn update(
        &self,
        observed: &Self::Observed,
        desired: &Self::Desired,
    ) -> Result<Self::Status, ItemError>;

    /// Bind a placeholder to a desired item. Defaults to `update`.
    async fn reauthorize(
        &self,
        observed: &Self::Observed,
        desired: &Self::Desired,
    ) -> Result<Self::Status, ItemError> {
        self.update(observed, desired).await
    }

    async fn delete(&self, observed: &Self::Observed) -> Result<(), ItemError>;

    /// Status for a matched pair that needs no remote call.
    fn unchanged(&self, observed: &Self::Observed, desired: &Self::Desired) -> Self::Status;

    fn failed(&self, desired: &Self::Desired, stage: Stage, message: String) -> Self::Status;

    /// Status recorded for an isolated delete failure, if the family keeps one.
    fn delete_failed(&self, _observed: &Self::Observed, _message: String) -> Option<Self::Status> {
        None
    }

    fn delete_policy(&self) -> DeletePolicy {
        DeletePolicy::FailFast
    }

    /// Remove auxiliary remote objects no surviving item references.
    async fn cleanup(&self, _statuses: &[Self::Status]) -> Result<(), RemoteError> {
        Ok(())
    }
}

/// Result of applying one family's diff.
#[derive(Debug, Clone)]
pub struct Applied<S> {
    /// Desired-order statuses, followed by isolated delete failures.
    pub statuses: Vec<S>,
    pub created: usize,
    pub updated: usize,
    pub reauthorized: usize,
    pub deleted: usize,
    pub failed: usize,
}

async fn race<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, ItemError>
where
    F: Future<Output = Result<T, ItemError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ItemError::Remote(RemoteError::Cancelled)),
        result = fut => result,
    }
}

fn record(family: &'static str, operation: &'static str) {
    metrics::counter!(
        "converge_operations_total",
        "family" => family,
        "operation" => operation
    )
    .increment(1);
}

fn record_failure(family: &'static str) {
    metrics::counter!("converge_item_failures_total", "family" => family).increment(1);
}

/// Apply a diff, isolating per-item failures.
pub async fn apply<F: Converge>(
    family: &F,
    diff: Diff<F::Observed, F::Desired>,
    cancel: &CancellationToken,
) -> Result<Applied<F::Status>, ApplyError> {
    let name = family.name();
    let mut applied = Applied {
        statuses: Vec::new(),
        created: 0,
        updated: 0,
        reauthorized: 0,
        deleted: 0,
        failed: 0,
    };
    let mut indexed: Vec<(usize, F::Status)> = Vec::new();
    let mut orphaned: Vec<F::Status> = Vec::new();

    for observed in &diff.delete {
        let key = family.key(observed);
        match race(cancel, family.delete(observed)).await {
            Ok(()) => {
                applied.deleted += 1;
                record(name, "delete");
                tracing::debug!(family = name, key = %key, "deleted remote item");
            }
            Err(e) if e.is_cancelled() => return Err(ApplyError::Cancelled),
            Err(e) => match family.delete_policy() {
                DeletePolicy::FailFast => {
                    record_failure(name);
                    tracing::warn!(family = name, key = %key, error = %e, "delete failed");
                    return Err(ApplyError::Delete {
                        family: name,
                        key,
                        source: e,
                    });
                }
                DeletePolicy::Isolated => {
                    applied.failed += 1;
                    record_failure(name);
                    tracing::warn!(family = name, key = %key, error = %e, "delete failed, continuing");
                    if let Some(status) = family.delete_failed(observed, e.to_string()) {
                        orphaned.push(status);
                    }
                }
            },
        }
    }

    for create in &diff.create {
        if let Err(message) = family.validate(&create.desired) {
            applied.failed += 1;
            record_failure(name);
            tracing::warn!(family = name, index = create.index, error = %message, "validation failed");
            indexed.push((
                create.index,
                family.failed(&create.desired, Stage::Validate, message),
            ));
            continue;
        }

        match race(cancel, family.create(&create.desired)).await {
            Ok(status) => {
                applied.created += 1;
                record(name, "create");
                indexed.push((create.index, status));
            }
            Err(e) if e.is_cancelled() => return Err(ApplyError::Cancelled),
            Err(e) => {
                applied.failed += 1;
                record_failure(name);
                tracing::warn!(family = name, index = create.index, error = %e, "create failed");
                indexed.push((
                    create.index,
                    family.failed(&create.desired, Stage::Create, e.to_string()),
                ));
            }
        }
    }

    for update in &diff.update {
        if !update.changed {
            indexed.push((
                update.index,
                family.unchanged(&update.observed, &update.desired),
            ));
            continue;
        }

        match race(cancel, family.update(&update.observed, &update.desired)).await {
            Ok(status) => {
                applied.updated += 1;
                record(name, "update");
                indexed.push((update.index, status));
            }
            Err(e) if e.is_cancelled() => return Err(ApplyError::Cancelled),
            Err(e) => {
                applied.failed += 1;
                record_failure(name);
                tracing::warn!(family = name, key = %family.key(&update.observed), error = %e, "update failed");
                indexed.push((
                    update.index,
                    family.failed(&update.desired, Stage::Update, e.to_string()),
                ));
            }
        }
    }

    for pair in &diff.reauthorize {
        match race(cancel, family.reauthorize(&pair.observed, &pair.desired)).await {
            Ok(status) => {
                applied.reauthorized += 1;
                record(name, "reauthorize");
                indexed.push((pair.index, status));
            }
            Err(e) if e.is_cancelled() => return Err(ApplyError::Cancelled),
            Err(e) => {
                applied.failed += 1;
                record_failure(name);
                tracing::warn!(family = name, key = %family.key(&pair.observed), error = %e, "authorize failed");
                indexed.push((
                    pair.index,
                    family.failed(&pair.desired, Stage::Authorize, e.to_string()),
                ));
            }
        }
    }

    indexed.sort_by_key(|(index, _)| *index);
    applied.statuses = indexed.into_iter().map(|(_, status)| status).collect();

    let cleanup = async {
        family
            .cleanup(&applied.statuses)
            .await
            .map_err(ItemError::Remote)
    };
    match race(cancel, cleanup).await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => return Err(ApplyError::Cancelled),
        Err(ItemError::Remote(source)) | Err(ItemError::Step { source, .. }) => {
            return Err(ApplyError::Cleanup {
                family: name,
                source,
            })
        }
        Err(ItemError::Invalid(message)) => {
            return Err(ApplyError::Cleanup {
                family: name,
                source: RemoteError::Decode(message),
            })
        }
    }

    applied.statuses.extend(orphaned);

    tracing::debug!(
        family = name,
        created = applied.created,
        updated = applied.updated,
        reauthorized = applied.reauthorized,
        deleted = applied.deleted,
        failed = applied.failed,
        "applied diff"
    );

    Ok(applied)
}
