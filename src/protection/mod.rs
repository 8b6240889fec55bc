//! Ownership / deletion-protection gate.
//!
//! When protection is on, a pass may only mutate remote state if every
//! observed item is either something we applied before or something we want
//! now. Anything else might be a resource created out of band, so the family
//! stops with [`Reason::DeletionProtection`] instead of deleting it.

use crate::project::ProjectSpec;
use crate::workflow::{Outcome, Reason};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Annotation holding the JSON of the last fully applied spec.
pub const ANNOTATION_LAST_APPLIED_CONFIGURATION: &str = "mongodb.com/last-applied-configuration";

const PROTECTION_DOCS: &str = "https://dochub.mongodb.org/core/ako-deletion-protection";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtectionError {
    #[error("failed to decode last applied configuration: {0}")]
    Decode(String),

    #[error("failed to encode applied configuration: {0}")]
    Encode(String),
}

/// Family-specific identity used for set difference.
pub trait Identifiable {
    fn identifier(&self) -> String;
}

/// Items of `a` whose identifier does not appear in `b`.
pub fn difference<'a, A, B>(a: &'a [A], b: &[B]) -> Vec<&'a A>
where
    A: Identifiable,
    B: Identifiable,
{
    let known: HashSet<String> = b.iter().map(Identifiable::identifier).collect();
    a.iter()
        .filter(|item| !known.contains(&item.identifier()))
        .collect()
}

/// Decide whether this pass may mutate the family's remote state.
pub fn can_reconcile<P, D, O>(
    protected: bool,
    previously_applied: &[P],
    desired: &[D],
    observed: &[O],
) -> bool
where
    P: Identifiable,
    D: Identifiable,
    O: Identifiable,
{
    if !protected {
        return true;
    }
    if observed.is_empty() {
        return true;
    }
    if difference(observed, previously_applied).is_empty() {
        return true;
    }
    difference(desired, observed).is_empty()
}

/// Decoded last-applied spec.
pub struct LastApplied;

impl LastApplied {
    /// Missing annotation → empty spec; malformed JSON → hard error.
    pub fn decode(annotations: &HashMap<String, String>) -> Result<ProjectSpec, ProtectionError> {
        match annotations.get(ANNOTATION_LAST_APPLIED_CONFIGURATION) {
            None => Ok(ProjectSpec::default()),
            Some(raw) => {
                serde_json::from_str(raw).map_err(|e| ProtectionError::Decode(e.to_string()))
            }
        }
    }

    pub fn encode(spec: &ProjectSpec) -> Result<String, ProtectionError> {
        serde_json::to_string(spec).map_err(|e| ProtectionError::Encode(e.to_string()))
    }
}

/// Terminal outcome for a family refused by the gate.
pub fn blocked_outcome(feature: &str) -> Outcome {
    Outcome::terminate(
        Reason::DeletionProtection,
        format!(
            "unable to reconcile {} due to deletion protection being enabled. see {} for further information",
            feature, PROTECTION_DOCS
        ),
    )
}

/// Terminal outcome when the gate lacks the data to decide.
pub fn ownership_error_outcome(err: &dyn std::fmt::Display) -> Outcome {
    Outcome::terminate(
        Reason::Internal,
        format!("unable to resolve ownership for deletion protection: {}", err),
    )
}

impl Identifiable for String {
    fn identifier(&self) -> String {
        self.clone()
    }
}
