//! Placement group controller.

use async_trait::async_trait;
use tracing::info;

use super::{Controller, Creation, Observation};
use crate::error::{Result, WrapOp};
use crate::labels;
use crate::provider::{Cloud, LabelsUpdate, PlacementGroupCreateRequest};
use crate::spec::{Managed, PlacementGroupSpec};

pub struct PlacementGroupController {
    cloud: Cloud,
}

impl PlacementGroupController {
    pub fn new(cloud: Cloud) -> Self {
        Self { cloud }
    }
}

#[async_trait]
impl Controller for PlacementGroupController {
    type Spec = PlacementGroupSpec;

    async fn observe(&self, res: &Managed<PlacementGroupSpec>) -> Result<Observation> {
        let Some(id) = res.status.provider_id else {
            return Ok(Observation::absent());
        };

        match self
            .cloud
            .api()
            .get_placement_group(id)
            .await
            .op("get placement group")?
        {
            Some(_) => Ok(Observation::present(res.is_up_to_date())),
            None => Ok(Observation::absent()),
        }
    }

    async fn create(&self, res: &mut Managed<PlacementGroupSpec>) -> Result<Creation> {
        let result = self
            .cloud
            .api()
            .create_placement_group(&PlacementGroupCreateRequest {
                name: res.name.clone(),
                labels: labels::merge(&res.spec.labels),
                kind: res.spec.kind,
            })
            .await
            .op("create placement group")?;

        let id = result.placement_group.id;
        info!("Created placement group {} ({})", res.name, id);
        res.record_created(id);
        Ok(Creation::default())
    }

    async fn update(&self, res: &mut Managed<PlacementGroupSpec>) -> Result<()> {
        let id = res.provider_id("update placement group")?;
        let current = res.last_applied_or_spec().clone();
        let target = res.spec.clone();

        self.cloud
            .api()
            .update_placement_group(
                id,
                &LabelsUpdate {
                    labels: labels::merge(&target.labels),
                },
            )
            .await
            .op("update placement group")?;

        res.record_applied(PlacementGroupSpec {
            labels: target.labels,
            ..current
        });
        Ok(())
    }

    async fn delete(&self, res: &mut Managed<PlacementGroupSpec>) -> Result<()> {
        let id = res.provider_id("delete placement group")?;
        self.cloud
            .api()
            .delete_placement_group(id)
            .await
            .op("delete placement group")?;

        res.record_deleted();
        Ok(())
    }
}
