//! Outcome of a single reconciliation step.

use super::reason::Reason;
use std::time::Duration;

/// Fixed requeue interval used by every in-progress or terminated outcome.
pub const DEFAULT_RETRY: Duration = Duration::from_secs(10);

/// Result of one reconciliation step.
///
/// - `ok()`: converged, no deterministic requeue
/// - `in_progress(..)`: valid but not yet converged, requeue after [`DEFAULT_RETRY`]
/// - `terminate(..)`: failed, requeue after [`DEFAULT_RETRY`] unless `without_retry()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    terminated: bool,
    retry_after: Option<Duration>,
    reason: Option<Reason>,
    message: String,
    warning: bool,
}

impl Outcome {
    pub fn ok() -> Self {
        Self {
            terminated: false,
            retry_after: None,
            reason: None,
            message: String::new(),
            warning: false,
        }
    }

    /// Expected wait: the resource is valid but remote state has not caught up yet.
    pub fn in_progress(reason: Reason, message: impl Into<String>) -> Self {
        Self {
            terminated: false,
            retry_after: Some(DEFAULT_RETRY),
            reason: Some(reason),
            message: message.into(),
            warning: true,
        }
    }

    pub fn terminate(reason: Reason, message: impl Into<String>) -> Self {
        Self {
            terminated: true,
            retry_after: Some(DEFAULT_RETRY),
            reason: Some(reason),
            message: message.into(),
            warning: false,
        }
    }

    /// Suppress rescheduling; the failure needs operator attention.
    pub fn without_retry(mut self) -> Self {
        self.retry_after = None;
        self
    }

    /// True only for fully converged outcomes.
    pub fn is_ok(&self) -> bool {
        !self.terminated && self.reason.is_none()
    }

    pub fn is_in_progress(&self) -> bool {
        !self.terminated && self.reason.is_some()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn is_warning(&self) -> bool {
        self.warning
    }

    pub fn reason(&self) -> Option<Reason> {
        self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// How long the caller should wait before the next pass, if at all.
    pub fn requeue_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Self::ok()
    }
}
