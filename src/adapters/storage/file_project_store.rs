//! File-based Project Store Adapter
//!
//! Stores each project as a YAML file named after its id. Writes go to a
//! temporary sibling first and are renamed into place, so a crash never
//! leaves a half-written project behind.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::design::Project;
use crate::domain::foundation::ProjectId;
use crate::ports::{ProjectStore, StoreError};

/// File-based storage for design projects
#[derive(Debug, Clone)]
pub struct FileProjectStore {
    base_path: PathBuf,
}

impl FileProjectStore {
    /// Create a new file store rooted at `base_path`
    ///
    /// # Example
    /// ```ignore
    /// let store = FileProjectStore::new("./data/projects");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn project_file_path(&self, id: ProjectId) -> PathBuf {
        self.base_path.join(format!("{}.yaml", id))
    }

    fn temp_file_path(&self, id: ProjectId) -> PathBuf {
        self.base_path.join(format!(".{}.yaml.tmp", id))
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))
    }
}

#[async_trait]
impl ProjectStore for FileProjectStore {
    async fn load(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        let file_path = self.project_file_path(id);

        let yaml = match fs::read_to_string(&file_path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::IoError(e.to_string())),
        };

        let project = serde_yaml::from_str(&yaml)
            .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;

        Ok(Some(project))
    }

    async fn save(&self, project: &Project) -> Result<(), StoreError> {
        self.ensure_dir().await?;

        let yaml = serde_yaml::to_string(project)
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;

        let temp_path = self.temp_file_path(project.id());
        fs::write(&temp_path, yaml)
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))?;

        fs::rename(&temp_path, self.project_file_path(project.id()))
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))
    }

    async fn exists(&self, id: ProjectId) -> Result<bool, StoreError> {
        fs::try_exists(self.project_file_path(id))
            .await
            .map_err(|e| StoreError::IoError(e.to_string()))
    }

    async fn delete(&self, id: ProjectId) -> Result<(), StoreError> {
        match fs::remove_file(self.project_file_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::IoError(e.to_string())),
        }
    }
}
