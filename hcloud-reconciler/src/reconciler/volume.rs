//! Volume controller.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Controller, Creation, Observation};
use crate::error::{ReconcileError, Result, WrapOp};
use crate::labels;
use crate::provider::{Cloud, LabelsUpdate, ResourceId, VolumeCreateRequest};
use crate::spec::{Managed, VolumeSpec};

pub struct VolumeController {
    cloud: Cloud,
}

impl VolumeController {
    pub fn new(cloud: Cloud) -> Self {
        Self { cloud }
    }

    async fn detach(&self, id: ResourceId) -> Result<()> {
        let action = self
            .cloud
            .api()
            .detach_volume(id)
            .await
            .op("detach volume")?;
        self.cloud
            .wait(Some(&action))
            .await
            .op("wait for volume detach")
    }
}

#[async_trait]
impl Controller for VolumeController {
    type Spec = VolumeSpec;

    async fn observe(&self, res: &Managed<VolumeSpec>) -> Result<Observation> {
        let Some(id) = res.status.provider_id else {
            return Ok(Observation::absent());
        };

        match self.cloud.api().get_volume(id).await.op("get volume")? {
            Some(_) => Ok(Observation::present(res.is_up_to_date())),
            None => Ok(Observation::absent()),
        }
    }

    async fn create(&self, res: &mut Managed<VolumeSpec>) -> Result<Creation> {
        let spec = res.spec.clone();

        let location = match &spec.location {
            Some(name) => Some(self.cloud.location(name).await?.name),
            None => None,
        };

        if let Some(server) = spec.server_id {
            self.cloud
                .api()
                .get_server(server)
                .await
                .op("get server")?
                .ok_or_else(|| ReconcileError::reference("create volume", "server", server))?;
        }

        let result = self
            .cloud
            .api()
            .create_volume(&VolumeCreateRequest {
                name: res.name.clone(),
                size: spec.size,
                labels: labels::merge(&spec.labels),
                automount: spec.automount && spec.server_id.is_some(),
                format: spec.format,
                location,
                server: spec.server_id,
            })
            .await
            .op("create volume")?;

        info!(
            "Created volume {} ({}) with {} GB",
            res.name, result.volume.id, spec.size
        );
        res.record_created(result.volume.id);
        Ok(Creation::default())
    }

    async fn update(&self, res: &mut Managed<VolumeSpec>) -> Result<()> {
        let id = res.provider_id("update volume")?;
        let current = res.last_applied_or_spec().clone();
        let target = res.spec.clone();

        self.cloud
            .api()
            .update_volume(
                id,
                &LabelsUpdate {
                    labels: labels::merge(&target.labels),
                },
            )
            .await
            .op("update volume")?;

        if current.server_id != target.server_id {
            let volume = self
                .cloud
                .api()
                .get_volume(id)
                .await
                .op("get volume")?
                .ok_or_else(|| ReconcileError::vanished("update volume", "volume", id))?;

            if let Some(server) = volume.server {
                info!("Detaching volume {} ({}) from server {}", res.name, id, server);
                self.detach(id).await?;
            }

            if let Some(server) = target.server_id {
                info!("Attaching volume {} ({}) to server {}", res.name, id, server);
                let action = self
                    .cloud
                    .api()
                    .attach_volume(id, server, target.automount)
                    .await
                    .op("attach volume")?;
                self.cloud
                    .wait(Some(&action))
                    .await
                    .op("wait for volume attach")?;
            }
        }

        if target.size > current.size {
            // The recorded size may be a refused shrink, so the provider's
            // size decides whether this is still a grow.
            let volume = self
                .cloud
                .api()
                .get_volume(id)
                .await
                .op("get volume")?
                .ok_or_else(|| ReconcileError::vanished("update volume", "volume", id))?;

            if target.size > volume.size {
                info!(
                    "Resizing volume {} ({}) from {} GB to {} GB",
                    res.name, id, volume.size, target.size
                );
                let action = self
                    .cloud
                    .api()
                    .resize_volume(id, target.size)
                    .await
                    .op("resize volume")?;
                self.cloud
                    .wait(Some(&action))
                    .await
                    .op("wait for volume resize")?;
            } else {
                info!(
                    "Volume {} ({}) is already {} GB, not resizing to {} GB",
                    res.name, id, volume.size, target.size
                );
            }
        } else if target.size < current.size {
            warn!(
                "Volume {} ({}) cannot shrink from {} GB to {} GB, keeping size",
                res.name, id, current.size, target.size
            );
        }

        // A refused shrink is still recorded, otherwise it would count as
        // drift on every pass.
        res.record_applied(VolumeSpec {
            labels: target.labels,
            server_id: target.server_id,
            size: target.size,
            ..current
        });
        Ok(())
    }

    async fn delete(&self, res: &mut Managed<VolumeSpec>) -> Result<()> {
        let id = res.provider_id("delete volume")?;

        if let Some(volume) = self.cloud.api().get_volume(id).await.op("get volume")? {
            if volume.server.is_some() {
                self.detach(id).await?;
            }
        }

        self.cloud
            .api()
            .delete_volume(id)
            .await
            .op("delete volume")?;

        res.record_deleted();
        Ok(())
    }
}
