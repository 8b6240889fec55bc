//! Source of declared projects and sink for their status.
//!
//! Loading, watching and persistence belong to the host; the reconciler only
//! needs the three operations of [`DeclarativeStore`].

mod error;
mod memory;

pub use error::StoreError;
pub use memory::InMemoryStore;

use crate::project::ProjectSpec;
use crate::status::ProjectStatus;
use async_trait::async_trait;
use std::collections::HashMap;

/// One declared project as the reconciler sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredProject {
    /// Store key, e.g. `namespace/name`.
    pub identity: String,
    /// Remote project id.
    pub project_id: String,
    /// Owning organization, used for team lookups.
    pub org_id: String,
    pub spec: ProjectSpec,
    pub annotations: HashMap<String, String>,
    pub status: ProjectStatus,
}

#[async_trait]
pub trait DeclarativeStore: Send + Sync {
    async fn get(&self, identity: &str) -> Result<DeclaredProject, StoreError>;

    /// Record the spec that was fully applied, as the encoded annotation value.
    async fn apply_last_applied(&self, identity: &str, encoded: String) -> Result<(), StoreError>;

    async fn persist_status(&self, identity: &str, status: ProjectStatus) -> Result<(), StoreError>;
}
