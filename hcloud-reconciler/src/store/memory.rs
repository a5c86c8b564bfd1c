use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use super::{ResourceStore, Result, StoreError};
use crate::reconciler::ConnectionDetails;
use crate::spec::{Managed, Observed, ResourceSpec};

const EVENT_CAPACITY: usize = 256;

struct Inner<S> {
    instances: BTreeMap<String, Managed<S>>,
    connections: HashMap<String, ConnectionDetails>,
}

/// In-memory store. Declaring or retracting an instance notifies subscribers.
pub struct MemoryStore<S> {
    inner: RwLock<Inner<S>>,
    events: broadcast::Sender<String>,
}

impl<S: ResourceSpec> Default for MemoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ResourceSpec> MemoryStore<S> {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: RwLock::new(Inner {
                instances: BTreeMap::new(),
                connections: HashMap::new(),
            }),
            events,
        }
    }

    fn notify(&self, name: &str) {
        // No subscribers is fine.
        let _ = self.events.send(name.to_string());
    }

    /// Declare an instance or replace its desired spec.
    pub async fn apply(&self, name: &str, spec: S) {
        {
            let mut inner = self.inner.write().await;
            match inner.instances.get_mut(name) {
                Some(existing) => existing.spec = spec,
                None => {
                    inner
                        .instances
                        .insert(name.to_string(), Managed::new(name, spec));
                }
            }
        }
        debug!(kind = S::KIND, name, "Desired state applied");
        self.notify(name);
    }

    /// Insert a complete instance, status included.
    pub async fn insert(&self, managed: Managed<S>) {
        let name = managed.name.clone();
        self.inner
            .write()
            .await
            .instances
            .insert(name.clone(), managed);
        self.notify(&name);
    }

    /// Mark an instance for deletion.
    pub async fn request_deletion(&self, name: &str) -> Result<()> {
        {
            let mut inner = self.inner.write().await;
            let managed = inner
                .instances
                .get_mut(name)
                .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
            managed.deletion_requested = true;
        }
        self.notify(name);
        Ok(())
    }

    pub async fn status(&self, name: &str) -> Option<Observed<S>> {
        self.inner
            .read()
            .await
            .instances
            .get(name)
            .map(|m| m.status.clone())
    }

    pub async fn connection_details(&self, name: &str) -> Option<ConnectionDetails> {
        self.inner.read().await.connections.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.inner.read().await.instances.contains_key(name)
    }
}

#[async_trait]
impl<S: ResourceSpec> ResourceStore<S> for MemoryStore<S> {
    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().await.instances.keys().cloned().collect())
    }

    async fn get(&self, name: &str) -> Result<Option<Managed<S>>> {
        Ok(self.inner.read().await.instances.get(name).cloned())
    }

    async fn save_status(&self, name: &str, status: &Observed<S>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let managed = inner
            .instances
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        managed.status = status.clone();
        Ok(())
    }

    async fn finalize(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.instances.remove(name);
        inner.connections.remove(name);
        Ok(())
    }

    async fn publish_connection_details(
        &self,
        name: &str,
        details: &ConnectionDetails,
    ) -> Result<()> {
        self.inner
            .write()
            .await
            .connections
            .insert(name.to_string(), details.clone());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }
}
