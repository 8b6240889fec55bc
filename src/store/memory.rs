use super::{DeclarativeStore, DeclaredProject, StoreError};
use crate::protection::ANNOTATION_LAST_APPLIED_CONFIGURATION;
use crate::status::ProjectStatus;
use async_trait::async_trait;
use dashmap::DashMap;

/// Thread-safe in-memory store keyed by project identity.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    projects: DashMap<String, DeclaredProject>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a declared project.
    pub fn put(&self, project: DeclaredProject) {
        self.projects.insert(project.identity.clone(), project);
    }

    /// Snapshot of a stored project.
    pub fn snapshot(&self, identity: &str) -> Option<DeclaredProject> {
        self.projects.get(identity).map(|p| p.value().clone())
    }

    pub fn remove(&self, identity: &str) -> Option<DeclaredProject> {
        self.projects.remove(identity).map(|(_, project)| project)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[async_trait]
impl DeclarativeStore for InMemoryStore {
    async fn get(&self, identity: &str) -> Result<DeclaredProject, StoreError> {
        self.snapshot(identity)
            .ok_or_else(|| StoreError::NotFound(identity.to_string()))
    }

    async fn apply_last_applied(&self, identity: &str, encoded: String) -> Result<(), StoreError> {
        let mut project = self
            .projects
            .get_mut(identity)
            .ok_or_else(|| StoreError::NotFound(identity.to_string()))?;
        project
            .annotations
            .insert(ANNOTATION_LAST_APPLIED_CONFIGURATION.to_string(), encoded);
        Ok(())
    }

    async fn persist_status(&self, identity: &str, status: ProjectStatus) -> Result<(), StoreError> {
        let mut project = self
            .projects
            .get_mut(identity)
            .ok_or_else(|| StoreError::NotFound(identity.to_string()))?;
        project.status = status;
        Ok(())
    }
}
