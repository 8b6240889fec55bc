//! Declared project and the pass that converges it.
//!
//! One [`ProjectReconciler::reconcile`] call is one pass: load the declared
//! project, run every family against the remote, persist the resulting
//! status and, after a fully converged pass, record the applied spec.

pub mod spec;

pub use spec::*;

use crate::config::ReconcileConfig;
use crate::families::{self, PassInput};
use crate::protection::{self, LastApplied, ProtectionError};
use crate::remote::AtlasApi;
use crate::store::{DeclarativeStore, StoreError};
use crate::workflow::{Conditions, ConditionType, Context, Outcome};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Failures outside any family; the pass could not even report itself.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Protection(#[from] ProtectionError),
}

/// What one pass produced.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub pass_id: Uuid,
    /// First non-ok family outcome, or ok.
    pub outcome: Outcome,
    pub conditions: Conditions,
}

impl PassOutcome {
    pub fn is_ready(&self) -> bool {
        self.outcome.is_ok()
    }

    /// When the caller should schedule the next pass, if at all.
    pub fn requeue_after(&self) -> Option<Duration> {
        self.outcome.requeue_after()
    }
}

pub struct ProjectReconciler {
    store: Arc<dyn DeclarativeStore>,
    client: Arc<dyn AtlasApi>,
    config: ReconcileConfig,
}

impl ProjectReconciler {
    pub fn new(
        store: Arc<dyn DeclarativeStore>,
        client: Arc<dyn AtlasApi>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    /// Run one reconciliation pass for the declared project `identity`.
    pub async fn reconcile(
        &self,
        identity: &str,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome, ReconcileError> {
        let started = Instant::now();
        let project = self.store.get(identity).await?;

        let span = tracing::info_span!(
            "reconcile_pass",
            identity = %identity,
            project_id = %project.project_id,
            pass_id = tracing::field::Empty,
        );
        let mut ctx = Context::new(Arc::clone(&self.client), cancel.clone(), span.clone())
            .with_conditions(project.status.conditions.clone());
        span.record("pass_id", tracing::field::display(ctx.pass_id()));

        let result = async {
            let outcome = match LastApplied::decode(&project.annotations) {
                Ok(last_applied) => {
                    let input = PassInput {
                        project_id: &project.project_id,
                        org_id: &project.org_id,
                        spec: &project.spec,
                        last_applied: &last_applied,
                        protected: self.config.subresource_deletion_protection,
                        lookup_concurrency: self.config.lookup_concurrency,
                    };
                    run_families(&mut ctx, input).await
                }
                Err(e) => protection::ownership_error_outcome(&e),
            };

            if outcome.is_ok() {
                ctx.set_condition_true(ConditionType::Ready);
            } else {
                ctx.set_condition_from_result(ConditionType::Ready, &outcome);
            }

            let report = ctx.finish();
            let mut status = project.status.clone();
            status.apply_all(report.status_updates);
            status.conditions = report.conditions.clone();
            self.store.persist_status(identity, status).await?;

            if outcome.is_ok() {
                let encoded = LastApplied::encode(&project.spec)?;
                self.store.apply_last_applied(identity, encoded).await?;
            }

            tracing::info!(
                ready = outcome.is_ok(),
                reason = outcome.reason().map(|r| r.as_str()).unwrap_or_default(),
                "reconcile pass finished"
            );

            Ok::<_, ReconcileError>(PassOutcome {
                pass_id: report.pass_id,
                outcome,
                conditions: report.conditions,
            })
        }
        .instrument(span)
        .await;

        metrics::histogram!("converge_pass_duration_seconds").record(started.elapsed().as_secs_f64());
        result
    }
}

/// Run every family; a failing family never stops the ones after it.
async fn run_families(ctx: &mut Context, input: PassInput<'_>) -> Outcome {
    let outcomes = [
        families::ensure_network_peers(ctx, input).await,
        families::ensure_cloud_provider_integrations(ctx, input).await,
        families::ensure_integrations(ctx, input).await,
        families::ensure_custom_roles(ctx, input).await,
        families::ensure_assigned_teams(ctx, input).await,
        families::ensure_alert_configurations(ctx, input).await,
    ];

    outcomes
        .into_iter()
        .find(|outcome| !outcome.is_ok())
        .unwrap_or_else(Outcome::ok)
}
