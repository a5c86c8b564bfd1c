use serde::{Deserialize, Serialize};

use super::{DriftCheck, ResourceSpec};
use crate::labels::Labels;
use crate::provider::{Architecture, ResourceId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    pub image: String,
    pub server_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default = "default_architecture")]
    pub architecture: Architecture,
    #[serde(default)]
    pub auto_mount: bool,
    #[serde(default = "enabled")]
    pub enable_ipv4: bool,
    #[serde(default = "enabled")]
    pub enable_ipv6: bool,
    #[serde(default)]
    pub firewall_ids: Vec<ResourceId>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub network_ids: Vec<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_group_id: Option<ResourceId>,
    #[serde(default = "enabled")]
    pub power_on: bool,
    /// Public keys in OpenSSH format.
    #[serde(default)]
    pub ssh_keys: Vec<String>,
    #[serde(default = "enabled")]
    pub start_after_create: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default)]
    pub volume_ids: Vec<ResourceId>,
}

fn default_architecture() -> Architecture {
    Architecture::X86
}

fn enabled() -> bool {
    true
}

impl DriftCheck for ServerSpec {
    // Everything besides labels and power state is fixed at creation.
    fn is_up_to_date(&self, last_applied: &Self) -> bool {
        self.labels == last_applied.labels && self.power_on == last_applied.power_on
    }
}

impl ResourceSpec for ServerSpec {
    const KIND: &'static str = "server";
}
