//! Reconciliation behaviour

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Refuse to mutate a family whose remote state holds unknown items.
    pub subresource_deletion_protection: bool,
    /// Parallel lookups allowed inside one pass (team name resolution).
    pub lookup_concurrency: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            subresource_deletion_protection: true,
            lookup_concurrency: 4,
        }
    }
}
