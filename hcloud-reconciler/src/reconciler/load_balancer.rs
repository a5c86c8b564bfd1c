//! Load balancer controller.
//!
//! Updates run as a fixed sequence of sub-operations, each gated by its own
//! drift check and each waiting for its action before the next one starts:
//! labels, type, public interface, algorithm, network, services, targets.
//! Services and targets are replaced wholesale from what the provider reports.

use async_trait::async_trait;
use tracing::info;

use super::{Controller, Creation, Observation};
use crate::convert::load_balancer as convert;
use crate::error::{ReconcileError, Result, WrapOp};
use crate::labels;
use crate::provider::{
    Action, Algorithm, Cloud, LabelsUpdate, LoadBalancerCreateRequest, ProviderError,
};
use crate::spec::{LoadBalancerSpec, Managed};

pub struct LoadBalancerController {
    cloud: Cloud,
}

impl LoadBalancerController {
    pub fn new(cloud: Cloud) -> Self {
        Self { cloud }
    }

    /// Await the action returned by a mutating call.
    async fn step(
        &self,
        op: &'static str,
        call: std::result::Result<Action, ProviderError>,
    ) -> Result<()> {
        let action = call.op(op)?;
        self.cloud.wait(Some(&action)).await.op(op)
    }
}

#[async_trait]
impl Controller for LoadBalancerController {
    type Spec = LoadBalancerSpec;

    async fn observe(&self, res: &Managed<LoadBalancerSpec>) -> Result<Observation> {
        let Some(id) = res.status.provider_id else {
            return Ok(Observation::absent());
        };

        match self
            .cloud
            .api()
            .get_load_balancer(id)
            .await
            .op("get load balancer")?
        {
            Some(_) => Ok(Observation::present(res.is_up_to_date())),
            None => Ok(Observation::absent()),
        }
    }

    async fn create(&self, res: &mut Managed<LoadBalancerSpec>) -> Result<Creation> {
        let spec = res.spec.clone();
        let targets =
            convert::targets(&spec.targets, spec.network_id.is_some()).op("create load balancer")?;

        if let Some(network) = spec.network_id {
            self.cloud
                .api()
                .get_network(network)
                .await
                .op("get network")?
                .ok_or_else(|| {
                    ReconcileError::reference("create load balancer", "network", network)
                })?;
        }

        let location = match &spec.location {
            Some(name) => Some(self.cloud.location(name).await?.name),
            None => None,
        };

        let result = self
            .cloud
            .api()
            .create_load_balancer(&LoadBalancerCreateRequest {
                name: res.name.clone(),
                load_balancer_type: spec.lb_type.clone(),
                algorithm: Algorithm {
                    kind: spec.algorithm,
                },
                labels: labels::merge(&spec.labels),
                location,
                network_zone: spec.network_zone.clone(),
                network: spec.network_id,
                public_interface: spec.public_interface,
                services: convert::services(&spec.services),
                targets,
            })
            .await
            .op("create load balancer")?;

        let id = result.load_balancer.id;
        info!("Created load balancer {} ({})", res.name, id);
        res.record_created(id);
        Ok(Creation::default())
    }

    async fn update(&self, res: &mut Managed<LoadBalancerSpec>) -> Result<()> {
        let id = res.provider_id("update load balancer")?;
        let current = res.last_applied_or_spec().clone();
        let target = res.spec.clone();
        let api = self.cloud.api();

        let services = convert::services(&target.services);
        let targets = convert::targets(&target.targets, target.network_id.is_some())
            .op("update load balancer")?;

        let lb = api
            .get_load_balancer(id)
            .await
            .op("get load balancer")?
            .ok_or_else(|| {
                ReconcileError::vanished("update load balancer", "load balancer", id)
            })?;

        api.update_load_balancer(
            id,
            &LabelsUpdate {
                labels: labels::merge(&target.labels),
            },
        )
        .await
        .op("update load balancer")?;

        if current.lb_type != target.lb_type {
            info!(
                "Changing type of load balancer {} ({}) to {}",
                res.name, id, target.lb_type
            );
            self.step(
                "change load balancer type",
                api.change_load_balancer_type(id, &target.lb_type).await,
            )
            .await?;
        }

        if current.public_interface != target.public_interface {
            self.step(
                "set load balancer public interface",
                api.set_load_balancer_public_interface(id, target.public_interface)
                    .await,
            )
            .await?;
        }

        if current.algorithm != target.algorithm {
            self.step(
                "change load balancer algorithm",
                api.change_load_balancer_algorithm(id, target.algorithm).await,
            )
            .await?;
        }

        if current.network_id != target.network_id {
            for private in &lb.private_net {
                info!(
                    "Detaching load balancer {} ({}) from network {}",
                    res.name, id, private.network
                );
                self.step(
                    "detach load balancer from network",
                    api.detach_load_balancer_from_network(id, private.network)
                        .await,
                )
                .await?;
            }
            if let Some(network) = target.network_id {
                info!(
                    "Attaching load balancer {} ({}) to network {}",
                    res.name, id, network
                );
                self.step(
                    "attach load balancer to network",
                    api.attach_load_balancer_to_network(id, network).await,
                )
                .await?;
            }
        }

        if current.services != target.services {
            for service in &lb.services {
                self.step(
                    "delete load balancer service",
                    api.delete_load_balancer_service(id, service.listen_port)
                        .await,
                )
                .await?;
            }
            for service in &services {
                self.step(
                    "add load balancer service",
                    api.add_load_balancer_service(id, service).await,
                )
                .await?;
            }
        }

        if current.targets != target.targets {
            for existing in &lb.targets {
                self.step(
                    "remove load balancer target",
                    api.remove_load_balancer_target(id, existing).await,
                )
                .await?;
            }
            for desired in &targets {
                self.step(
                    "add load balancer target",
                    api.add_load_balancer_target(id, desired).await,
                )
                .await?;
            }
        }

        res.record_applied(target);
        Ok(())
    }

    async fn delete(&self, res: &mut Managed<LoadBalancerSpec>) -> Result<()> {
        let id = res.provider_id("delete load balancer")?;
        self.cloud
            .api()
            .delete_load_balancer(id)
            .await
            .op("delete load balancer")?;

        res.record_deleted();
        Ok(())
    }
}
