//! Storage Adapters
//!
//! Implementations of the ProjectStore port.
//!
//! ## Available Adapters
//!
//! - **FileProjectStore** - One YAML file per project
//! - **InMemoryProjectStore** - Projects in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileProjectStore, InMemoryProjectStore};
//!
//! // Production: file-based storage
//! let store = FileProjectStore::new("./data/projects");
//!
//! // Testing: in-memory storage
//! let store = InMemoryProjectStore::new();
//! ```

mod file_project_store;
mod in_memory_project_store;

pub use file_project_store::FileProjectStore;
pub use in_memory_project_store::InMemoryProjectStore;
