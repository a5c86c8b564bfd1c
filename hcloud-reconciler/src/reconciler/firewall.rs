//! Firewall controller.
//!
//! Any change to the rules or bindings replaces both wholesale: every binding
//! the provider reports is removed, the desired bindings are applied and the
//! full rule set is written. Each step waits for its actions.

use async_trait::async_trait;
use tracing::info;

use super::{Controller, Creation, Observation};
use crate::convert::firewall as convert;
use crate::error::{ReconcileError, Result, WrapOp};
use crate::labels;
use crate::provider::{Cloud, FirewallCreateRequest, FirewallResource, LabelsUpdate, ResourceId};
use crate::spec::{FirewallSpec, Managed};

pub struct FirewallController {
    cloud: Cloud,
}

impl FirewallController {
    pub fn new(cloud: Cloud) -> Self {
        Self { cloud }
    }

    async fn remove_bindings(&self, id: ResourceId, applied_to: &[FirewallResource]) -> Result<()> {
        if applied_to.is_empty() {
            return Ok(());
        }

        let actions = self
            .cloud
            .api()
            .remove_firewall_from_resources(id, applied_to)
            .await
            .op("remove firewall from resources")?;
        self.cloud
            .wait_all(&actions)
            .await
            .op("wait for firewall removal")
    }
}

#[async_trait]
impl Controller for FirewallController {
    type Spec = FirewallSpec;

    async fn observe(&self, res: &Managed<FirewallSpec>) -> Result<Observation> {
        let Some(id) = res.status.provider_id else {
            return Ok(Observation::absent());
        };

        match self.cloud.api().get_firewall(id).await.op("get firewall")? {
            Some(_) => Ok(Observation::present(res.is_up_to_date())),
            None => Ok(Observation::absent()),
        }
    }

    async fn create(&self, res: &mut Managed<FirewallSpec>) -> Result<Creation> {
        let rules = convert::rules(&res.spec.rules).op("create firewall")?;
        let apply_to = convert::resources(&res.spec.apply_to).op("create firewall")?;

        let result = self
            .cloud
            .api()
            .create_firewall(&FirewallCreateRequest {
                name: res.name.clone(),
                labels: labels::merge(&res.spec.labels),
                rules,
                apply_to,
            })
            .await
            .op("create firewall")?;

        info!("Created firewall {} ({})", res.name, result.firewall.id);
        res.record_created(result.firewall.id);
        Ok(Creation::default())
    }

    async fn update(&self, res: &mut Managed<FirewallSpec>) -> Result<()> {
        let id = res.provider_id("update firewall")?;
        let current = res.last_applied_or_spec().clone();
        let target = res.spec.clone();

        let rules = convert::rules(&target.rules).op("update firewall")?;
        let apply_to = convert::resources(&target.apply_to).op("update firewall")?;

        self.cloud
            .api()
            .update_firewall(
                id,
                &LabelsUpdate {
                    labels: labels::merge(&target.labels),
                },
            )
            .await
            .op("update firewall")?;

        if current.rules != target.rules || current.apply_to != target.apply_to {
            let firewall = self
                .cloud
                .api()
                .get_firewall(id)
                .await
                .op("get firewall")?
                .ok_or_else(|| ReconcileError::vanished("update firewall", "firewall", id))?;

            info!(
                "Replacing {} bindings and {} rules of firewall {} ({})",
                firewall.applied_to.len(),
                firewall.rules.len(),
                res.name,
                id
            );
            self.remove_bindings(id, &firewall.applied_to).await?;

            if !apply_to.is_empty() {
                let actions = self
                    .cloud
                    .api()
                    .apply_firewall_to_resources(id, &apply_to)
                    .await
                    .op("apply firewall to resources")?;
                self.cloud
                    .wait_all(&actions)
                    .await
                    .op("wait for firewall binding")?;
            }

            let actions = self
                .cloud
                .api()
                .set_firewall_rules(id, &rules)
                .await
                .op("set firewall rules")?;
            self.cloud
                .wait_all(&actions)
                .await
                .op("wait for firewall rules")?;
        }

        res.record_applied(target);
        Ok(())
    }

    async fn delete(&self, res: &mut Managed<FirewallSpec>) -> Result<()> {
        let id = res.provider_id("delete firewall")?;

        // The provider refuses to delete a firewall that is still applied.
        if let Some(firewall) = self.cloud.api().get_firewall(id).await.op("get firewall")? {
            self.remove_bindings(id, &firewall.applied_to).await?;
        }

        self.cloud
            .api()
            .delete_firewall(id)
            .await
            .op("delete firewall")?;

        res.record_deleted();
        Ok(())
    }
}
