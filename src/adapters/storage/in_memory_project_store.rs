//! In-Memory Project Store Adapter
//!
//! Keeps projects in memory. Used for tests and for sessions that do not
//! need to survive a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::design::Project;
use crate::domain::foundation::ProjectId;
use crate::ports::{ProjectStore, StoreError};

/// In-memory storage for design projects
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectStore {
    projects: Arc<RwLock<HashMap<ProjectId, Project>>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored projects (useful for tests)
    pub async fn clear(&self) {
        self.projects.write().await.clear();
    }

    /// Get the number of stored projects
    pub async fn project_count(&self) -> usize {
        self.projects.read().await.len()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn load(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn save(&self, project: &Project) -> Result<(), StoreError> {
        self.projects
            .write()
            .await
            .insert(project.id(), project.clone());
        Ok(())
    }

    async fn exists(&self, id: ProjectId) -> Result<bool, StoreError> {
        Ok(self.projects.read().await.contains_key(&id))
    }

    async fn delete(&self, id: ProjectId) -> Result<(), StoreError> {
        self.projects.write().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_returns_same_project() {
        let store = InMemoryProjectStore::new();
        let project = Project::new(ProjectId::new());

        store.save(&project).await.unwrap();
        let loaded = store.load(project.id()).await.unwrap();

        assert_eq!(loaded, Some(project));
    }

    #[tokio::test]
    async fn load_missing_project_returns_none() {
        let store = InMemoryProjectStore::new();
        assert!(store.load(ProjectId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exists_and_delete() {
        let store = InMemoryProjectStore::new();
        let project = Project::new(ProjectId::new());

        assert!(!store.exists(project.id()).await.unwrap());
        store.save(&project).await.unwrap();
        assert!(store.exists(project.id()).await.unwrap());

        store.delete(project.id()).await.unwrap();
        assert!(!store.exists(project.id()).await.unwrap());
        store.delete(project.id()).await.unwrap();
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemoryProjectStore::new();
        store.save(&Project::new(ProjectId::new())).await.unwrap();
        store.save(&Project::new(ProjectId::new())).await.unwrap();
        assert_eq!(store.project_count().await, 2);

        store.clear().await;
        assert_eq!(store.project_count().await, 0);
    }
}
