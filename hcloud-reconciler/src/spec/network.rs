use serde::{Deserialize, Serialize};

use super::{DriftCheck, ResourceSpec};
use crate::labels::Labels;
use crate::provider::{ResourceId, SubnetType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    pub ip_range: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub subnets: Vec<SubnetSpec>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub expose_routes_to_vswitch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSpec {
    #[serde(rename = "type")]
    pub kind: SubnetType,
    pub ip_range: String,
    pub network_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vswitch_id: Option<ResourceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub destination: String,
    pub gateway: String,
}

impl DriftCheck for NetworkSpec {
    // Subnets and routes are only written at creation time.
    fn is_up_to_date(&self, last_applied: &Self) -> bool {
        self.labels == last_applied.labels
            && self.ip_range == last_applied.ip_range
            && self.expose_routes_to_vswitch == last_applied.expose_routes_to_vswitch
    }
}

impl ResourceSpec for NetworkSpec {
    const KIND: &'static str = "network";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_network() -> NetworkSpec {
        NetworkSpec {
            ip_range: "10.0.0.0/16".to_string(),
            labels: Labels::from([("env".to_string(), "prod".to_string())]),
            subnets: vec![SubnetSpec {
                kind: SubnetType::Cloud,
                ip_range: "10.0.1.0/24".to_string(),
                network_zone: "eu-central".to_string(),
                vswitch_id: None,
            }],
            routes: vec![],
            expose_routes_to_vswitch: false,
        }
    }

    #[test]
    fn test_drift() {
        let applied = make_network();
        assert!(make_network().is_up_to_date(&applied));

        let mut desired = make_network();
        desired.labels.insert("team".to_string(), "infra".to_string());
        assert!(!desired.is_up_to_date(&applied));

        let mut desired = make_network();
        desired.ip_range = "10.0.0.0/8".to_string();
        assert!(!desired.is_up_to_date(&applied));

        let mut desired = make_network();
        desired.expose_routes_to_vswitch = true;
        assert!(!desired.is_up_to_date(&applied));
    }

    #[test]
    fn test_subnet_and_route_edits_are_ignored() {
        let applied = make_network();
        let mut desired = make_network();
        desired.subnets.clear();
        desired.routes.push(RouteSpec {
            destination: "10.100.1.0/24".to_string(),
            gateway: "10.0.1.1".to_string(),
        });
        assert!(desired.is_up_to_date(&applied));
    }

    #[test]
    fn test_deserialize() {
        let spec: NetworkSpec = serde_json::from_str(
            r#"{
                "ipRange": "10.0.0.0/16",
                "subnets": [{"type": "vswitch", "ipRange": "10.0.2.0/24", "networkZone": "eu-central", "vswitchId": 1000}],
                "routes": [{"destination": "10.100.1.0/24", "gateway": "10.0.1.1"}],
                "exposeRoutesToVswitch": true
            }"#,
        )
        .unwrap();
        assert!(spec.labels.is_empty());
        assert_eq!(spec.subnets[0].kind, SubnetType::Vswitch);
        assert_eq!(spec.subnets[0].vswitch_id, Some(1000));
        assert!(spec.expose_routes_to_vswitch);
    }
}
