//! Provider resource models and request bodies.
//!
//! The shapes follow the provider's REST representation so the HTTP client can
//! (de)serialize them directly.

use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::labels::Labels;

/// Provider-assigned resource identifier.
pub type ResourceId = i64;

// ============================================================================
// Actions
// ============================================================================

/// Status of an asynchronous provider operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Running,
    Success,
    Error,
}

/// Error reported by a failed action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFailure {
    pub code: String,
    pub message: String,
}

/// Handle to an asynchronous provider operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ResourceId,
    pub command: String,
    pub status: ActionStatus,
    #[serde(default)]
    pub error: Option<ActionFailure>,
}

// ============================================================================
// Shared enums and references
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    Arm,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::Arm => "arm",
        }
    }
}

/// Reference to another resource by id (`{"id": 1}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: ResourceId,
}

/// Label selector reference (`{"selector": "k=v"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRef {
    pub selector: String,
}

/// Body for the labels-only update endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsUpdate {
    pub labels: Labels,
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub network_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datacenter {
    pub id: ResourceId,
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ResourceId,
    #[serde(default)]
    pub name: Option<String>,
    pub architecture: Architecture,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerType {
    pub id: ResourceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    pub id: ResourceId,
    pub name: String,
    pub fingerprint: String,
    pub public_key: String,
    #[serde(default)]
    pub labels: Labels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyCreateRequest {
    pub name: String,
    pub public_key: String,
    pub labels: Labels,
}

// ============================================================================
// Networks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetType {
    Cloud,
    Server,
    Vswitch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSubnet {
    #[serde(rename = "type")]
    pub kind: SubnetType,
    pub ip_range: IpNet,
    pub network_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vswitch_id: Option<ResourceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRoute {
    pub destination: IpNet,
    pub gateway: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: ResourceId,
    pub name: String,
    pub ip_range: IpNet,
    #[serde(default)]
    pub subnets: Vec<NetworkSubnet>,
    #[serde(default)]
    pub routes: Vec<NetworkRoute>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub expose_routes_to_vswitch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCreateRequest {
    pub name: String,
    pub ip_range: IpNet,
    pub labels: Labels,
    pub subnets: Vec<NetworkSubnet>,
    pub routes: Vec<NetworkRoute>,
    pub expose_routes_to_vswitch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkUpdateRequest {
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_routes_to_vswitch: Option<bool>,
}

// ============================================================================
// Servers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Initializing,
    Starting,
    Running,
    Stopping,
    Off,
    Deleting,
    Migrating,
    Rebuilding,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRef {
    pub ip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPublicNet {
    #[serde(default)]
    pub ipv4: Option<IpRef>,
    #[serde(default)]
    pub ipv6: Option<IpRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: ResourceId,
    pub name: String,
    pub status: ServerStatus,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub public_net: ServerPublicNet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCreatePublicNet {
    pub enable_ipv4: bool,
    pub enable_ipv6: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCreateFirewall {
    pub firewall: ResourceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCreateRequest {
    pub name: String,
    pub server_type: String,
    pub image: ResourceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub automount: bool,
    pub start_after_create: bool,
    pub public_net: ServerCreatePublicNet,
    pub firewalls: Vec<ServerCreateFirewall>,
    pub networks: Vec<ResourceId>,
    pub volumes: Vec<ResourceId>,
    pub ssh_keys: Vec<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement_group: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    pub labels: Labels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCreateResult {
    pub server: Server,
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub next_actions: Vec<Action>,
    #[serde(default)]
    pub root_password: Option<String>,
}

// ============================================================================
// Firewalls
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallProtocol {
    Tcp,
    Udp,
    Icmp,
    Esp,
    Gre,
}

impl FirewallProtocol {
    /// Whether rules of this protocol carry a port.
    pub fn has_ports(&self) -> bool {
        matches!(self, FirewallProtocol::Tcp | FirewallProtocol::Udp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub direction: FirewallDirection,
    pub protocol: FirewallProtocol,
    #[serde(default)]
    pub source_ips: Vec<IpNet>,
    #[serde(default)]
    pub destination_ips: Vec<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Resource a firewall is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FirewallResource {
    Server { server: IdRef },
    LabelSelector { label_selector: SelectorRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firewall {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub rules: Vec<FirewallRule>,
    #[serde(default)]
    pub applied_to: Vec<FirewallResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallCreateRequest {
    pub name: String,
    pub labels: Labels,
    pub rules: Vec<FirewallRule>,
    pub apply_to: Vec<FirewallResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallCreateResult {
    pub firewall: Firewall,
    #[serde(default)]
    pub actions: Vec<Action>,
}

// ============================================================================
// Load balancers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmType {
    RoundRobin,
    LeastConnections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithm {
    #[serde(rename = "type")]
    pub kind: AlgorithmType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceProtocol {
    Tcp,
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckHttp {
    #[serde(default)]
    pub domain: Option<String>,
    pub path: String,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub status_codes: Vec<String>,
    #[serde(default)]
    pub tls: bool,
}

/// Health check of a service; intervals are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub protocol: ServiceProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HealthCheckHttp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHttp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_lifetime: Option<u64>,
    #[serde(default)]
    pub certificates: Vec<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_http: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky_sessions: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerService {
    pub protocol: ServiceProtocol,
    pub listen_port: u16,
    pub destination_port: u16,
    #[serde(rename = "proxyprotocol")]
    pub proxy_protocol: bool,
    pub health_check: HealthCheck,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<ServiceHttp>,
}

/// What a load balancer target points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetRef {
    Server { server: IdRef },
    LabelSelector { label_selector: SelectorRef },
    Ip { ip: IpRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerTarget {
    #[serde(flatten)]
    pub target: TargetRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_private_ip: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerTypeRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerPublicNet {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerPrivateNet {
    pub network: ResourceId,
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    pub load_balancer_type: LoadBalancerTypeRef,
    pub algorithm: Algorithm,
    #[serde(default)]
    pub public_net: LoadBalancerPublicNet,
    #[serde(default)]
    pub private_net: Vec<LoadBalancerPrivateNet>,
    #[serde(default)]
    pub services: Vec<LoadBalancerService>,
    #[serde(default)]
    pub targets: Vec<LoadBalancerTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerCreateRequest {
    pub name: String,
    pub load_balancer_type: String,
    pub algorithm: Algorithm,
    pub labels: Labels,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<ResourceId>,
    pub public_interface: bool,
    pub services: Vec<LoadBalancerService>,
    pub targets: Vec<LoadBalancerTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerCreateResult {
    pub load_balancer: LoadBalancer,
    #[serde(default)]
    pub action: Option<Action>,
}

// ============================================================================
// Volumes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeFormat {
    Ext4,
    Xfs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: ResourceId,
    pub name: String,
    /// Size in GB.
    pub size: u32,
    #[serde(default)]
    pub server: Option<ResourceId>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeCreateRequest {
    pub name: String,
    pub size: u32,
    pub labels: Labels,
    pub automount: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<VolumeFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ResourceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeCreateResult {
    pub volume: Volume,
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub next_actions: Vec<Action>,
}

// ============================================================================
// Placement groups
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementGroupType {
    Spread,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroup {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(rename = "type")]
    pub kind: PlacementGroupType,
    #[serde(default)]
    pub servers: Vec<ResourceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroupCreateRequest {
    pub name: String,
    pub labels: Labels,
    #[serde(rename = "type")]
    pub kind: PlacementGroupType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroupCreateResult {
    pub placement_group: PlacementGroup,
    #[serde(default)]
    pub action: Option<Action>,
}
