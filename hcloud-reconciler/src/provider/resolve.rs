//! Reference resolution shared by the controllers.

use tracing::info;
use uuid::Uuid;

use super::types::{Datacenter, Location, SshKey, SshKeyCreateRequest};
use super::Cloud;
use crate::convert::{ConvertError, ssh};
use crate::error::{ReconcileError, Result, WrapOp};
use crate::labels::{self, Labels};

/// Where a server gets placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Datacenter(Datacenter),
    Location(Location),
}

impl Placement {
    pub fn datacenter_name(&self) -> Option<String> {
        match self {
            Placement::Datacenter(dc) => Some(dc.name.clone()),
            Placement::Location(_) => None,
        }
    }

    pub fn location_name(&self) -> Option<String> {
        match self {
            Placement::Datacenter(_) => None,
            Placement::Location(location) => Some(location.name.clone()),
        }
    }
}

impl Cloud {
    /// Resolve a datacenter or, failing that, a location. The datacenter wins
    /// when both are given.
    pub async fn datacenter_or_location(
        &self,
        datacenter: Option<&str>,
        location: Option<&str>,
    ) -> Result<Placement> {
        if let Some(name) = datacenter {
            return match self.api().datacenter_by_name(name).await.op("get datacenter")? {
                Some(dc) => Ok(Placement::Datacenter(dc)),
                None => Err(ReconcileError::reference("get datacenter", "datacenter", name)),
            };
        }

        if let Some(name) = location {
            return match self.api().location_by_name(name).await.op("get location")? {
                Some(location) => Ok(Placement::Location(location)),
                None => Err(ReconcileError::reference("get location", "location", name)),
            };
        }

        Err(ConvertError::MissingPlacement).op("get datacenter or location")
    }

    /// Look up a location by name.
    pub async fn location(&self, name: &str) -> Result<Location> {
        self.api()
            .location_by_name(name)
            .await
            .op("get location")?
            .ok_or_else(|| ReconcileError::reference("get location", "location", name))
    }

    /// Find each key by fingerprint, uploading the ones the provider lacks.
    pub async fn upsert_ssh_keys(&self, public_keys: &[String]) -> Result<Vec<SshKey>> {
        let mut keys = Vec::with_capacity(public_keys.len());
        for public_key in public_keys {
            keys.push(self.upsert_ssh_key(public_key).await?);
        }
        Ok(keys)
    }

    pub async fn upsert_ssh_key(&self, public_key: &str) -> Result<SshKey> {
        let fingerprint = ssh::fingerprint(public_key).op("upsert ssh key")?;

        if let Some(key) = self
            .api()
            .ssh_key_by_fingerprint(&fingerprint)
            .await
            .op("get ssh key")?
        {
            return Ok(key);
        }

        let req = SshKeyCreateRequest {
            name: Uuid::new_v4().to_string(),
            public_key: public_key.to_string(),
            labels: labels::merge(&Labels::new()),
        };
        let key = self.api().create_ssh_key(&req).await.op("create ssh key")?;
        info!(id = key.id, %fingerprint, "Uploaded ssh key {}", key.name);
        Ok(key)
    }
}
