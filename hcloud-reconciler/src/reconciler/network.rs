//! Network controller.

use async_trait::async_trait;
use tracing::info;

use super::{Controller, Creation, Observation};
use crate::convert::cidr::{parse_cidr, parse_ip};
use crate::convert;
use crate::error::{Result, WrapOp};
use crate::labels;
use crate::provider::{
    Cloud, NetworkCreateRequest, NetworkRoute, NetworkSubnet, NetworkUpdateRequest,
};
use crate::spec::{Managed, NetworkSpec};

pub struct NetworkController {
    cloud: Cloud,
}

impl NetworkController {
    pub fn new(cloud: Cloud) -> Self {
        Self { cloud }
    }
}

fn create_request(name: &str, spec: &NetworkSpec) -> convert::Result<NetworkCreateRequest> {
    let subnets = spec
        .subnets
        .iter()
        .map(|subnet| {
            Ok(NetworkSubnet {
                kind: subnet.kind,
                ip_range: parse_cidr(&subnet.ip_range)?,
                network_zone: subnet.network_zone.clone(),
                vswitch_id: subnet.vswitch_id,
            })
        })
        .collect::<convert::Result<Vec<_>>>()?;

    let routes = spec
        .routes
        .iter()
        .map(|route| {
            Ok(NetworkRoute {
                destination: parse_cidr(&route.destination)?,
                gateway: parse_ip(&route.gateway)?,
            })
        })
        .collect::<convert::Result<Vec<_>>>()?;

    Ok(NetworkCreateRequest {
        name: name.to_string(),
        ip_range: parse_cidr(&spec.ip_range)?,
        labels: labels::merge(&spec.labels),
        subnets,
        routes,
        expose_routes_to_vswitch: spec.expose_routes_to_vswitch,
    })
}

#[async_trait]
impl Controller for NetworkController {
    type Spec = NetworkSpec;

    async fn observe(&self, res: &Managed<NetworkSpec>) -> Result<Observation> {
        let Some(id) = res.status.provider_id else {
            return Ok(Observation::absent());
        };

        match self.cloud.api().get_network(id).await.op("get network")? {
            Some(_) => Ok(Observation::present(res.is_up_to_date())),
            None => Ok(Observation::absent()),
        }
    }

    async fn create(&self, res: &mut Managed<NetworkSpec>) -> Result<Creation> {
        let req = create_request(&res.name, &res.spec).op("create network")?;
        let network = self
            .cloud
            .api()
            .create_network(&req)
            .await
            .op("create network")?;

        info!("Created network {} ({})", res.name, network.id);
        res.record_created(network.id);
        Ok(Creation::default())
    }

    async fn update(&self, res: &mut Managed<NetworkSpec>) -> Result<()> {
        let id = res.provider_id("update network")?;
        let current = res.last_applied_or_spec().clone();
        let target = res.spec.clone();
        let ip_range = parse_cidr(&target.ip_range).op("update network")?;

        self.cloud
            .api()
            .update_network(
                id,
                &NetworkUpdateRequest {
                    labels: labels::merge(&target.labels),
                    expose_routes_to_vswitch: Some(target.expose_routes_to_vswitch),
                },
            )
            .await
            .op("update network")?;

        if current.ip_range != target.ip_range {
            info!(
                "Changing IP range of network {} ({}) to {}",
                res.name, id, ip_range
            );
            let action = self
                .cloud
                .api()
                .change_network_ip_range(id, ip_range)
                .await
                .op("change network ip range")?;
            self.cloud
                .wait(Some(&action))
                .await
                .op("wait for network ip range change")?;
        }

        // Subnets and routes are not reconciled after creation.
        res.record_applied(NetworkSpec {
            subnets: current.subnets,
            routes: current.routes,
            ..target
        });
        Ok(())
    }

    async fn delete(&self, res: &mut Managed<NetworkSpec>) -> Result<()> {
        let id = res.provider_id("delete network")?;
        self.cloud
            .api()
            .delete_network(id)
            .await
            .op("delete network")?;

        res.record_deleted();
        Ok(())
    }
}
