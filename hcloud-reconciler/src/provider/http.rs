//! REST implementation of the provider API.

use std::time::Duration;

use async_trait::async_trait;
use ipnet::IpNet;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Value, json};
use tracing::debug;

use super::error::{ProviderError, Result};
use super::types::*;
use super::{
    ActionApi, CatalogApi, FirewallApi, LoadBalancerApi, NetworkApi, PlacementGroupApi, ServerApi,
    VolumeApi,
};

/// Public API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.hetzner.cloud/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Client for the provider's REST API, authenticated with a bearer token.
#[derive(Clone)]
pub struct HcloudClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for HcloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HcloudClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HcloudClient {
    /// Client for the public endpoint.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, token)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hcloud-reconciler/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "Provider request");
        self.http
            .request(method, format!("{}{}", self.endpoint, path))
            .bearer_auth(&self.token)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let body: &[u8] = if body.is_empty() { b"null" } else { &body };
        Ok(serde_json::from_slice(body)?)
    }

    /// Send and extract one top-level field of the response envelope.
    async fn send_field<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        field: &'static str,
    ) -> Result<T> {
        let mut body: Value = self.send(req).await?;
        let value = body.get_mut(field).map(Value::take).unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    /// Like [`Self::send_field`], mapping "not found" to `None`.
    async fn get_field<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &'static str,
    ) -> Result<Option<T>> {
        match self.send_field(self.request(Method::GET, path), field).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// First entry of a filtered list endpoint.
    async fn find_first<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        field: &'static str,
    ) -> Result<Option<T>> {
        let items: Vec<T> = self
            .send_field(self.request(Method::GET, path).query(query), field)
            .await?;
        Ok(items.into_iter().next())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let _: IgnoredAny = self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    async fn action(&self, path: &str, body: Option<Value>) -> Result<Action> {
        let mut req = self.request(Method::POST, path);
        if let Some(body) = body {
            req = req.json(&body);
        }
        self.send_field(req, "action").await
    }

    async fn actions(&self, path: &str, body: Value) -> Result<Vec<Action>> {
        self.send_field(self.request(Method::POST, path).json(&body), "actions")
            .await
    }
}

fn api_error(status: StatusCode, body: &[u8]) -> ProviderError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => ProviderError::api(status.as_u16(), parsed.error.code, parsed.error.message),
        Err(_) => ProviderError::api(
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown"),
            String::from_utf8_lossy(body),
        ),
    }
}

#[async_trait]
impl ActionApi for HcloudClient {
    async fn get_action(&self, id: ResourceId) -> Result<Action> {
        self.send_field(self.request(Method::GET, &format!("/actions/{}", id)), "action")
            .await
    }
}

#[async_trait]
impl NetworkApi for HcloudClient {
    async fn get_network(&self, id: ResourceId) -> Result<Option<Network>> {
        self.get_field(&format!("/networks/{}", id), "network").await
    }

    async fn create_network(&self, req: &NetworkCreateRequest) -> Result<Network> {
        self.send_field(self.request(Method::POST, "/networks").json(req), "network")
            .await
    }

    async fn update_network(&self, id: ResourceId, req: &NetworkUpdateRequest) -> Result<Network> {
        self.send_field(
            self.request(Method::PUT, &format!("/networks/{}", id)).json(req),
            "network",
        )
        .await
    }

    async fn delete_network(&self, id: ResourceId) -> Result<()> {
        self.delete(&format!("/networks/{}", id)).await
    }

    async fn change_network_ip_range(&self, id: ResourceId, ip_range: IpNet) -> Result<Action> {
        self.action(
            &format!("/networks/{}/actions/change_ip_range", id),
            Some(json!({ "ip_range": ip_range })),
        )
        .await
    }
}

#[async_trait]
impl ServerApi for HcloudClient {
    async fn get_server(&self, id: ResourceId) -> Result<Option<Server>> {
        self.get_field(&format!("/servers/{}", id), "server").await
    }

    async fn create_server(&self, req: &ServerCreateRequest) -> Result<ServerCreateResult> {
        self.send(self.request(Method::POST, "/servers").json(req)).await
    }

    async fn update_server(&self, id: ResourceId, req: &LabelsUpdate) -> Result<Server> {
        self.send_field(
            self.request(Method::PUT, &format!("/servers/{}", id)).json(req),
            "server",
        )
        .await
    }

    async fn delete_server(&self, id: ResourceId) -> Result<Option<Action>> {
        self.send_field(self.request(Method::DELETE, &format!("/servers/{}", id)), "action")
            .await
    }

    async fn power_on_server(&self, id: ResourceId) -> Result<Action> {
        self.action(&format!("/servers/{}/actions/poweron", id), None)
            .await
    }

    async fn power_off_server(&self, id: ResourceId) -> Result<Action> {
        self.action(&format!("/servers/{}/actions/poweroff", id), None)
            .await
    }
}

#[async_trait]
impl FirewallApi for HcloudClient {
    async fn get_firewall(&self, id: ResourceId) -> Result<Option<Firewall>> {
        self.get_field(&format!("/firewalls/{}", id), "firewall").await
    }

    async fn create_firewall(&self, req: &FirewallCreateRequest) -> Result<FirewallCreateResult> {
        self.send(self.request(Method::POST, "/firewalls").json(req)).await
    }

    async fn update_firewall(&self, id: ResourceId, req: &LabelsUpdate) -> Result<Firewall> {
        self.send_field(
            self.request(Method::PUT, &format!("/firewalls/{}", id)).json(req),
            "firewall",
        )
        .await
    }

    async fn delete_firewall(&self, id: ResourceId) -> Result<()> {
        self.delete(&format!("/firewalls/{}", id)).await
    }

    async fn apply_firewall_to_resources(
        &self,
        id: ResourceId,
        resources: &[FirewallResource],
    ) -> Result<Vec<Action>> {
        self.actions(
            &format!("/firewalls/{}/actions/apply_to_resources", id),
            json!({ "apply_to": resources }),
        )
        .await
    }

    async fn remove_firewall_from_resources(
        &self,
        id: ResourceId,
        resources: &[FirewallResource],
    ) -> Result<Vec<Action>> {
        self.actions(
            &format!("/firewalls/{}/actions/remove_from_resources", id),
            json!({ "remove_from": resources }),
        )
        .await
    }

    async fn set_firewall_rules(
        &self,
        id: ResourceId,
        rules: &[FirewallRule],
    ) -> Result<Vec<Action>> {
        self.actions(
            &format!("/firewalls/{}/actions/set_rules", id),
            json!({ "rules": rules }),
        )
        .await
    }
}

#[async_trait]
impl LoadBalancerApi for HcloudClient {
    async fn get_load_balancer(&self, id: ResourceId) -> Result<Option<LoadBalancer>> {
        self.get_field(&format!("/load_balancers/{}", id), "load_balancer")
            .await
    }

    async fn create_load_balancer(
        &self,
        req: &LoadBalancerCreateRequest,
    ) -> Result<LoadBalancerCreateResult> {
        self.send(self.request(Method::POST, "/load_balancers").json(req))
            .await
    }

    async fn update_load_balancer(
        &self,
        id: ResourceId,
        req: &LabelsUpdate,
    ) -> Result<LoadBalancer> {
        self.send_field(
            self.request(Method::PUT, &format!("/load_balancers/{}", id))
                .json(req),
            "load_balancer",
        )
        .await
    }

    async fn delete_load_balancer(&self, id: ResourceId) -> Result<()> {
        self.delete(&format!("/load_balancers/{}", id)).await
    }

    async fn change_load_balancer_type(&self, id: ResourceId, lb_type: &str) -> Result<Action> {
        self.action(
            &format!("/load_balancers/{}/actions/change_type", id),
            Some(json!({ "load_balancer_type": lb_type })),
        )
        .await
    }

    async fn set_load_balancer_public_interface(
        &self,
        id: ResourceId,
        enabled: bool,
    ) -> Result<Action> {
        let command = if enabled {
            "enable_public_interface"
        } else {
            "disable_public_interface"
        };
        self.action(&format!("/load_balancers/{}/actions/{}", id, command), None)
            .await
    }

    async fn change_load_balancer_algorithm(
        &self,
        id: ResourceId,
        algorithm: AlgorithmType,
    ) -> Result<Action> {
        self.action(
            &format!("/load_balancers/{}/actions/change_algorithm", id),
            Some(json!({ "type": algorithm })),
        )
        .await
    }

    async fn attach_load_balancer_to_network(
        &self,
        id: ResourceId,
        network: ResourceId,
    ) -> Result<Action> {
        self.action(
            &format!("/load_balancers/{}/actions/attach_to_network", id),
            Some(json!({ "network": network })),
        )
        .await
    }

    async fn detach_load_balancer_from_network(
        &self,
        id: ResourceId,
        network: ResourceId,
    ) -> Result<Action> {
        self.action(
            &format!("/load_balancers/{}/actions/detach_from_network", id),
            Some(json!({ "network": network })),
        )
        .await
    }

    async fn add_load_balancer_service(
        &self,
        id: ResourceId,
        service: &LoadBalancerService,
    ) -> Result<Action> {
        self.action(
            &format!("/load_balancers/{}/actions/add_service", id),
            Some(serde_json::to_value(service)?),
        )
        .await
    }

    async fn delete_load_balancer_service(
        &self,
        id: ResourceId,
        listen_port: u16,
    ) -> Result<Action> {
        self.action(
            &format!("/load_balancers/{}/actions/delete_service", id),
            Some(json!({ "listen_port": listen_port })),
        )
        .await
    }

    async fn add_load_balancer_target(
        &self,
        id: ResourceId,
        target: &LoadBalancerTarget,
    ) -> Result<Action> {
        self.action(
            &format!("/load_balancers/{}/actions/add_target", id),
            Some(serde_json::to_value(target)?),
        )
        .await
    }

    async fn remove_load_balancer_target(
        &self,
        id: ResourceId,
        target: &LoadBalancerTarget,
    ) -> Result<Action> {
        // Removal identifies the target only; private addressing is not accepted.
        self.action(
            &format!("/load_balancers/{}/actions/remove_target", id),
            Some(serde_json::to_value(&target.target)?),
        )
        .await
    }
}

#[async_trait]
impl VolumeApi for HcloudClient {
    async fn get_volume(&self, id: ResourceId) -> Result<Option<Volume>> {
        self.get_field(&format!("/volumes/{}", id), "volume").await
    }

    async fn create_volume(&self, req: &VolumeCreateRequest) -> Result<VolumeCreateResult> {
        self.send(self.request(Method::POST, "/volumes").json(req)).await
    }

    async fn update_volume(&self, id: ResourceId, req: &LabelsUpdate) -> Result<Volume> {
        self.send_field(
            self.request(Method::PUT, &format!("/volumes/{}", id)).json(req),
            "volume",
        )
        .await
    }

    async fn delete_volume(&self, id: ResourceId) -> Result<()> {
        self.delete(&format!("/volumes/{}", id)).await
    }

    async fn attach_volume(
        &self,
        id: ResourceId,
        server: ResourceId,
        automount: bool,
    ) -> Result<Action> {
        self.action(
            &format!("/volumes/{}/actions/attach", id),
            Some(json!({ "server": server, "automount": automount })),
        )
        .await
    }

    async fn detach_volume(&self, id: ResourceId) -> Result<Action> {
        self.action(&format!("/volumes/{}/actions/detach", id), None)
            .await
    }

    async fn resize_volume(&self, id: ResourceId, size: u32) -> Result<Action> {
        self.action(
            &format!("/volumes/{}/actions/resize", id),
            Some(json!({ "size": size })),
        )
        .await
    }
}

#[async_trait]
impl PlacementGroupApi for HcloudClient {
    async fn get_placement_group(&self, id: ResourceId) -> Result<Option<PlacementGroup>> {
        self.get_field(&format!("/placement_groups/{}", id), "placement_group")
            .await
    }

    async fn create_placement_group(
        &self,
        req: &PlacementGroupCreateRequest,
    ) -> Result<PlacementGroupCreateResult> {
        self.send(self.request(Method::POST, "/placement_groups").json(req))
            .await
    }

    async fn update_placement_group(
        &self,
        id: ResourceId,
        req: &LabelsUpdate,
    ) -> Result<PlacementGroup> {
        self.send_field(
            self.request(Method::PUT, &format!("/placement_groups/{}", id))
                .json(req),
            "placement_group",
        )
        .await
    }

    async fn delete_placement_group(&self, id: ResourceId) -> Result<()> {
        self.delete(&format!("/placement_groups/{}", id)).await
    }
}

#[async_trait]
impl CatalogApi for HcloudClient {
    async fn image_by_name(&self, name: &str, arch: Architecture) -> Result<Option<Image>> {
        self.find_first(
            "/images",
            &[("name", name), ("architecture", arch.as_str())],
            "images",
        )
        .await
    }

    async fn server_type_by_name(&self, name: &str) -> Result<Option<ServerType>> {
        self.find_first("/server_types", &[("name", name)], "server_types")
            .await
    }

    async fn datacenter_by_name(&self, name: &str) -> Result<Option<Datacenter>> {
        self.find_first("/datacenters", &[("name", name)], "datacenters")
            .await
    }

    async fn location_by_name(&self, name: &str) -> Result<Option<Location>> {
        self.find_first("/locations", &[("name", name)], "locations")
            .await
    }

    async fn ssh_key_by_fingerprint(&self, fingerprint: &str) -> Result<Option<SshKey>> {
        self.find_first("/ssh_keys", &[("fingerprint", fingerprint)], "ssh_keys")
            .await
    }

    async fn create_ssh_key(&self, req: &SshKeyCreateRequest) -> Result<SshKey> {
        self.send_field(self.request(Method::POST, "/ssh_keys").json(req), "ssh_key")
            .await
    }
}
