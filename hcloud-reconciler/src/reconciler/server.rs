//! Server controller.
//!
//! Servers are effectively immutable after creation: only labels and the
//! power state are reconciled. Creation resolves every referenced resource
//! before anything is written at the provider.

use std::net::Ipv6Addr;

use async_trait::async_trait;
use ipnet::Ipv6Net;
use tracing::{debug, info};

use super::{ConnectionDetails, Controller, Creation, Observation};
use crate::error::{ReconcileError, Result, WrapOp};
use crate::labels;
use crate::provider::{
    Cloud, LabelsUpdate, ResourceId, ServerCreateFirewall, ServerCreatePublicNet,
    ServerCreateRequest, ServerCreateResult, ServerStatus,
};
use crate::spec::{Managed, ServerSpec};

const SSH_USER: &str = "root";
const SSH_PORT: u16 = 22;

pub struct ServerController {
    cloud: Cloud,
}

impl ServerController {
    pub fn new(cloud: Cloud) -> Self {
        Self { cloud }
    }

    async fn ensure_firewalls(&self, ids: &[ResourceId]) -> Result<Vec<ServerCreateFirewall>> {
        let mut firewalls = Vec::with_capacity(ids.len());
        for &id in ids {
            self.cloud
                .api()
                .get_firewall(id)
                .await
                .op("get firewall")?
                .ok_or_else(|| ReconcileError::reference("create server", "firewall", id))?;
            firewalls.push(ServerCreateFirewall { firewall: id });
        }
        Ok(firewalls)
    }

    async fn ensure_networks(&self, ids: &[ResourceId]) -> Result<()> {
        for &id in ids {
            self.cloud
                .api()
                .get_network(id)
                .await
                .op("get network")?
                .ok_or_else(|| ReconcileError::reference("create server", "network", id))?;
        }
        Ok(())
    }

    async fn ensure_volumes(&self, ids: &[ResourceId]) -> Result<()> {
        for &id in ids {
            self.cloud
                .api()
                .get_volume(id)
                .await
                .op("get volume")?
                .ok_or_else(|| ReconcileError::reference("create server", "volume", id))?;
        }
        Ok(())
    }
}

fn connection_details(result: &ServerCreateResult) -> ConnectionDetails {
    let public_net = &result.server.public_net;
    let endpoint = match (&public_net.ipv4, &public_net.ipv6) {
        (Some(ipv4), _) => ipv4.ip.clone(),
        (None, Some(ipv6)) => ipv6_host(&ipv6.ip),
        (None, None) => String::new(),
    };

    ConnectionDetails {
        endpoint,
        username: SSH_USER.to_string(),
        port: SSH_PORT,
        password: result
            .root_password
            .clone()
            .filter(|password| !password.is_empty()),
    }
}

/// The provider reports the server's IPv6 network; the server itself holds the
/// first address in it.
fn ipv6_host(network: &str) -> String {
    match network.parse::<Ipv6Net>() {
        Ok(net) => Ipv6Addr::from(u128::from(net.network()) + 1).to_string(),
        Err(_) => network.to_string(),
    }
}

#[async_trait]
impl Controller for ServerController {
    type Spec = ServerSpec;

    async fn observe(&self, res: &Managed<ServerSpec>) -> Result<Observation> {
        let Some(id) = res.status.provider_id else {
            return Ok(Observation::absent());
        };

        match self.cloud.api().get_server(id).await.op("get server")? {
            Some(server) => {
                let available = matches!(server.status, ServerStatus::Running | ServerStatus::Off);
                debug!(id, status = ?server.status, available, "Server {} observed", res.name);
                Ok(Observation::present(res.is_up_to_date()))
            }
            None => Ok(Observation::absent()),
        }
    }

    async fn create(&self, res: &mut Managed<ServerSpec>) -> Result<Creation> {
        let spec = res.spec.clone();
        let api = self.cloud.api();

        let placement = self
            .cloud
            .datacenter_or_location(spec.datacenter.as_deref(), spec.location.as_deref())
            .await?;

        let firewalls = self.ensure_firewalls(&spec.firewall_ids).await?;

        let image = api
            .image_by_name(&spec.image, spec.architecture)
            .await
            .op("get image")?
            .ok_or_else(|| ReconcileError::reference("create server", "image", &spec.image))?;

        self.ensure_networks(&spec.network_ids).await?;

        if let Some(id) = spec.placement_group_id {
            api.get_placement_group(id)
                .await
                .op("get placement group")?
                .ok_or_else(|| ReconcileError::reference("create server", "placement group", id))?;
        }

        let server_type = api
            .server_type_by_name(&spec.server_type)
            .await
            .op("get server type")?
            .ok_or_else(|| {
                ReconcileError::reference("create server", "server type", &spec.server_type)
            })?;

        self.ensure_volumes(&spec.volume_ids).await?;

        let ssh_keys = self.cloud.upsert_ssh_keys(&spec.ssh_keys).await?;

        let req = ServerCreateRequest {
            name: res.name.clone(),
            server_type: server_type.name,
            image: image.id,
            datacenter: placement.datacenter_name(),
            location: placement.location_name(),
            automount: spec.auto_mount && !spec.volume_ids.is_empty(),
            start_after_create: spec.start_after_create,
            public_net: ServerCreatePublicNet {
                enable_ipv4: spec.enable_ipv4,
                enable_ipv6: spec.enable_ipv6,
            },
            firewalls,
            networks: spec.network_ids.clone(),
            volumes: spec.volume_ids.clone(),
            ssh_keys: ssh_keys.iter().map(|key| key.id).collect(),
            placement_group: spec.placement_group_id,
            user_data: spec.user_data.clone(),
            labels: labels::merge(&spec.labels),
        };

        let result = api.create_server(&req).await.op("create server")?;

        info!("Created server {} ({})", res.name, result.server.id);
        res.record_created(result.server.id);
        Ok(Creation {
            connection_details: Some(connection_details(&result)),
        })
    }

    async fn update(&self, res: &mut Managed<ServerSpec>) -> Result<()> {
        let id = res.provider_id("update server")?;
        let current = res.last_applied_or_spec().clone();
        let target = res.spec.clone();

        self.cloud
            .api()
            .update_server(
                id,
                &LabelsUpdate {
                    labels: labels::merge(&target.labels),
                },
            )
            .await
            .op("update server")?;

        if current.power_on != target.power_on {
            info!(
                "Powering {} server {} ({})",
                if target.power_on { "on" } else { "off" },
                res.name,
                id
            );
            let action = if target.power_on {
                self.cloud.api().power_on_server(id).await
            } else {
                self.cloud.api().power_off_server(id).await
            }
            .op("change server power state")?;
            self.cloud
                .wait(Some(&action))
                .await
                .op("wait for server power state")?;
        }

        res.record_applied(ServerSpec {
            labels: target.labels,
            power_on: target.power_on,
            ..current
        });
        Ok(())
    }

    async fn delete(&self, res: &mut Managed<ServerSpec>) -> Result<()> {
        let id = res.provider_id("delete server")?;
        let action = self
            .cloud
            .api()
            .delete_server(id)
            .await
            .op("delete server")?;
        self.cloud
            .wait(action.as_ref())
            .await
            .op("wait for server deletion")?;

        res.record_deleted();
        Ok(())
    }
}
