//! Provider API surface.
//!
//! Each resource kind has its own trait so tests can reason about one kind at a
//! time; [`CloudApi`] bundles them for the controllers. [`Cloud`] pairs an API
//! implementation with the [`ActionWaiter`] and the cross-kind helpers the
//! controllers share.

pub mod action;
pub mod error;
pub mod http;
mod resolve;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use ipnet::IpNet;

pub use action::ActionWaiter;
pub use error::{ActionError, ProviderError, Result};
pub use http::HcloudClient;
pub use resolve::Placement;
pub use types::*;

#[async_trait]
pub trait ActionApi: Send + Sync {
    async fn get_action(&self, id: ResourceId) -> Result<Action>;
}

#[async_trait]
pub trait NetworkApi: Send + Sync {
    async fn get_network(&self, id: ResourceId) -> Result<Option<Network>>;
    async fn create_network(&self, req: &NetworkCreateRequest) -> Result<Network>;
    async fn update_network(&self, id: ResourceId, req: &NetworkUpdateRequest) -> Result<Network>;
    async fn delete_network(&self, id: ResourceId) -> Result<()>;
    async fn change_network_ip_range(&self, id: ResourceId, ip_range: IpNet) -> Result<Action>;
}

#[async_trait]
pub trait ServerApi: Send + Sync {
    async fn get_server(&self, id: ResourceId) -> Result<Option<Server>>;
    async fn create_server(&self, req: &ServerCreateRequest) -> Result<ServerCreateResult>;
    async fn update_server(&self, id: ResourceId, req: &LabelsUpdate) -> Result<Server>;
    async fn delete_server(&self, id: ResourceId) -> Result<Option<Action>>;
    async fn power_on_server(&self, id: ResourceId) -> Result<Action>;
    async fn power_off_server(&self, id: ResourceId) -> Result<Action>;
}

#[async_trait]
pub trait FirewallApi: Send + Sync {
    async fn get_firewall(&self, id: ResourceId) -> Result<Option<Firewall>>;
    async fn create_firewall(&self, req: &FirewallCreateRequest) -> Result<FirewallCreateResult>;
    async fn update_firewall(&self, id: ResourceId, req: &LabelsUpdate) -> Result<Firewall>;
    async fn delete_firewall(&self, id: ResourceId) -> Result<()>;
    async fn apply_firewall_to_resources(
        &self,
        id: ResourceId,
        resources: &[FirewallResource],
    ) -> Result<Vec<Action>>;
    async fn remove_firewall_from_resources(
        &self,
        id: ResourceId,
        resources: &[FirewallResource],
    ) -> Result<Vec<Action>>;
    async fn set_firewall_rules(&self, id: ResourceId, rules: &[FirewallRule])
    -> Result<Vec<Action>>;
}

#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    async fn get_load_balancer(&self, id: ResourceId) -> Result<Option<LoadBalancer>>;
    async fn create_load_balancer(
        &self,
        req: &LoadBalancerCreateRequest,
    ) -> Result<LoadBalancerCreateResult>;
    async fn update_load_balancer(&self, id: ResourceId, req: &LabelsUpdate)
    -> Result<LoadBalancer>;
    async fn delete_load_balancer(&self, id: ResourceId) -> Result<()>;
    async fn change_load_balancer_type(&self, id: ResourceId, lb_type: &str) -> Result<Action>;
    async fn set_load_balancer_public_interface(
        &self,
        id: ResourceId,
        enabled: bool,
    ) -> Result<Action>;
    async fn change_load_balancer_algorithm(
        &self,
        id: ResourceId,
        algorithm: AlgorithmType,
    ) -> Result<Action>;
    async fn attach_load_balancer_to_network(
        &self,
        id: ResourceId,
        network: ResourceId,
    ) -> Result<Action>;
    async fn detach_load_balancer_from_network(
        &self,
        id: ResourceId,
        network: ResourceId,
    ) -> Result<Action>;
    async fn add_load_balancer_service(
        &self,
        id: ResourceId,
        service: &LoadBalancerService,
    ) -> Result<Action>;
    async fn delete_load_balancer_service(&self, id: ResourceId, listen_port: u16)
    -> Result<Action>;
    async fn add_load_balancer_target(
        &self,
        id: ResourceId,
        target: &LoadBalancerTarget,
    ) -> Result<Action>;
    async fn remove_load_balancer_target(
        &self,
        id: ResourceId,
        target: &LoadBalancerTarget,
    ) -> Result<Action>;
}

#[async_trait]
pub trait VolumeApi: Send + Sync {
    async fn get_volume(&self, id: ResourceId) -> Result<Option<Volume>>;
    async fn create_volume(&self, req: &VolumeCreateRequest) -> Result<VolumeCreateResult>;
    async fn update_volume(&self, id: ResourceId, req: &LabelsUpdate) -> Result<Volume>;
    async fn delete_volume(&self, id: ResourceId) -> Result<()>;
    async fn attach_volume(
        &self,
        id: ResourceId,
        server: ResourceId,
        automount: bool,
    ) -> Result<Action>;
    async fn detach_volume(&self, id: ResourceId) -> Result<Action>;
    async fn resize_volume(&self, id: ResourceId, size: u32) -> Result<Action>;
}

#[async_trait]
pub trait PlacementGroupApi: Send + Sync {
    async fn get_placement_group(&self, id: ResourceId) -> Result<Option<PlacementGroup>>;
    async fn create_placement_group(
        &self,
        req: &PlacementGroupCreateRequest,
    ) -> Result<PlacementGroupCreateResult>;
    async fn update_placement_group(
        &self,
        id: ResourceId,
        req: &LabelsUpdate,
    ) -> Result<PlacementGroup>;
    async fn delete_placement_group(&self, id: ResourceId) -> Result<()>;
}

/// Lookups of provider-owned catalog entries referenced by name.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn image_by_name(&self, name: &str, arch: Architecture) -> Result<Option<Image>>;
    async fn server_type_by_name(&self, name: &str) -> Result<Option<ServerType>>;
    async fn datacenter_by_name(&self, name: &str) -> Result<Option<Datacenter>>;
    async fn location_by_name(&self, name: &str) -> Result<Option<Location>>;
    async fn ssh_key_by_fingerprint(&self, fingerprint: &str) -> Result<Option<SshKey>>;
    async fn create_ssh_key(&self, req: &SshKeyCreateRequest) -> Result<SshKey>;
}

/// The complete provider API.
pub trait CloudApi:
    ActionApi
    + NetworkApi
    + ServerApi
    + FirewallApi
    + LoadBalancerApi
    + VolumeApi
    + PlacementGroupApi
    + CatalogApi
{
}

impl<T> CloudApi for T where
    T: ActionApi
        + NetworkApi
        + ServerApi
        + FirewallApi
        + LoadBalancerApi
        + VolumeApi
        + PlacementGroupApi
        + CatalogApi
{
}

/// Shared provider handle used by every controller.
#[derive(Clone)]
pub struct Cloud {
    api: Arc<dyn CloudApi>,
    waiter: ActionWaiter,
}

impl Cloud {
    pub fn new(api: Arc<dyn CloudApi>, waiter: ActionWaiter) -> Self {
        Self { api, waiter }
    }

    pub fn api(&self) -> &dyn CloudApi {
        self.api.as_ref()
    }

    pub fn waiter(&self) -> ActionWaiter {
        self.waiter
    }

    /// Wait for a single action; `None` returns immediately.
    pub async fn wait(&self, action: Option<&Action>) -> std::result::Result<(), ActionError> {
        self.waiter.wait(self.api.as_ref(), action).await
    }

    /// Wait for a batch of actions in the order given.
    pub async fn wait_all(&self, actions: &[Action]) -> std::result::Result<(), ActionError> {
        self.waiter.wait_all(self.api.as_ref(), actions).await
    }
}
