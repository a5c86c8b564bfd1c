use serde::{Deserialize, Serialize};

use super::{DriftCheck, ResourceSpec};
use crate::convert::port::FirewallPort;
use crate::labels::Labels;
use crate::provider::{FirewallDirection, FirewallProtocol, ResourceId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallSpec {
    #[serde(default)]
    pub apply_to: Vec<FirewallApplyTo>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub rules: Vec<FirewallRuleSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirewallApplyToType {
    Server,
    LabelSelector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallApplyTo {
    #[serde(rename = "type")]
    pub kind: FirewallApplyToType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleSpec {
    pub direction: FirewallDirection,
    pub protocol: FirewallProtocol,
    /// CIDRs of the remote side: sources for inbound rules, destinations for
    /// outbound ones.
    #[serde(default)]
    pub target_ips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<FirewallPort>,
}

impl DriftCheck for FirewallSpec {
    fn is_up_to_date(&self, last_applied: &Self) -> bool {
        self.labels == last_applied.labels
            && self.apply_to == last_applied.apply_to
            && self.rules == last_applied.rules
    }
}

impl ResourceSpec for FirewallSpec {
    const KIND: &'static str = "firewall";
}
