use serde::{Deserialize, Serialize};

use super::{DriftCheck, ResourceSpec};
use crate::convert::Duration;
use crate::labels::Labels;
use crate::provider::{AlgorithmType, ResourceId, ServiceProtocol};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerSpec {
    /// Load balancer type name, e.g. `lb11`.
    #[serde(rename = "type")]
    pub lb_type: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: AlgorithmType,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<ResourceId>,
    #[serde(default = "enabled")]
    pub public_interface: bool,
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

fn default_algorithm() -> AlgorithmType {
    AlgorithmType::RoundRobin
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub listen_port: u16,
    pub destination_port: u16,
    pub protocol: ServiceProtocol,
    #[serde(default)]
    pub proxy_protocol: bool,
    pub health_check: HealthCheckSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<ServiceHttpSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckSpec {
    pub protocol: ServiceProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HealthCheckHttpSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckHttpSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default)]
    pub status_codes: Vec<String>,
    #[serde(default)]
    pub tls: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHttpSpec {
    #[serde(default)]
    pub certificate_ids: Vec<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_lifetime: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_http: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky_sessions: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Server,
    LabelSelector,
    Ip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSpec {
    #[serde(rename = "type")]
    pub kind: TargetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default)]
    pub use_private_ip: bool,
}

impl DriftCheck for LoadBalancerSpec {
    // Location and network zone are fixed at creation.
    fn is_up_to_date(&self, last_applied: &Self) -> bool {
        self.labels == last_applied.labels
            && self.lb_type == last_applied.lb_type
            && self.public_interface == last_applied.public_interface
            && self.algorithm == last_applied.algorithm
            && self.network_id == last_applied.network_id
            && self.services == last_applied.services
            && self.targets == last_applied.targets
    }
}

impl ResourceSpec for LoadBalancerSpec {
    const KIND: &'static str = "load_balancer";
}
