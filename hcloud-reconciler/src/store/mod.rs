//! State store for declared instances.
//!
//! The store owns the desired specs and persists the observed state the
//! controllers hand back after each successful step. Two implementations ship
//! with the crate: [`MemoryStore`] for embedding and tests, and [`FileStore`]
//! which keeps one JSON document per instance on disk.

mod file;
mod memory;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::reconciler::ConnectionDetails;
use crate::spec::{Managed, Observed};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Instance not found.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("internal: {0}")]
    Internal(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage of declared instances of one kind.
#[async_trait]
pub trait ResourceStore<S>: Send + Sync {
    /// Names of every declared instance.
    async fn list(&self) -> Result<Vec<String>>;

    async fn get(&self, name: &str) -> Result<Option<Managed<S>>>;

    /// Persist the observed state of an instance.
    async fn save_status(&self, name: &str, status: &Observed<S>) -> Result<()>;

    /// Forget an instance whose provider resource has been deleted.
    async fn finalize(&self, name: &str) -> Result<()>;

    /// Hand connection details of a freshly created resource to the caller.
    async fn publish_connection_details(
        &self,
        name: &str,
        details: &ConnectionDetails,
    ) -> Result<()>;

    /// Subscribe to change notifications carrying instance names.
    fn subscribe(&self) -> broadcast::Receiver<String>;
}
