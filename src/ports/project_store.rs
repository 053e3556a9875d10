//! Project Store Port - Interface for persisting design projects.
//!
//! Projects are saved whole after every committed transition and loaded
//! by id when a session resumes. Implementations exist for in-memory and
//! file-based storage.

use async_trait::async_trait;

use crate::domain::design::Project;
use crate::domain::foundation::ProjectId;

/// Errors that can occur during project storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to serialize project: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize project: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for persisting and loading projects.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Load a project.
    ///
    /// # Returns
    /// `None` if no project is stored under `id`.
    async fn load(&self, id: ProjectId) -> Result<Option<Project>, StoreError>;

    /// Save a project, replacing any previous version.
    async fn save(&self, project: &Project) -> Result<(), StoreError>;

    /// Check if a project exists.
    async fn exists(&self, id: ProjectId) -> Result<bool, StoreError>;

    /// Delete a project. Deleting a missing project is not an error.
    async fn delete(&self, id: ProjectId) -> Result<(), StoreError>;
}
