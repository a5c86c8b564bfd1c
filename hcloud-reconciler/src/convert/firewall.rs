//! Firewall rule and binding conversion.

use super::cidr::parse_cidrs;
use super::port::format_port;
use super::{ConvertError, Result};
use crate::labels::to_selector;
use crate::provider::{FirewallDirection, FirewallResource, FirewallRule, IdRef, SelectorRef};
use crate::spec::{FirewallApplyTo, FirewallApplyToType, FirewallRuleSpec};

/// Convert one rule. Inbound rules list the remote CIDRs as sources,
/// outbound rules as destinations.
pub fn rule(spec: &FirewallRuleSpec) -> Result<FirewallRule> {
    let ips = parse_cidrs(&spec.target_ips)?;
    let (source_ips, destination_ips) = match spec.direction {
        FirewallDirection::In => (ips, Vec::new()),
        FirewallDirection::Out => (Vec::new(), ips),
    };

    Ok(FirewallRule {
        direction: spec.direction,
        protocol: spec.protocol,
        source_ips,
        destination_ips,
        port: spec
            .protocol
            .has_ports()
            .then(|| format_port(spec.port.as_ref())),
        description: spec.description.clone(),
    })
}

pub fn rules(specs: &[FirewallRuleSpec]) -> Result<Vec<FirewallRule>> {
    specs.iter().map(rule).collect()
}

/// Convert an apply-to entry into the resource reference the provider binds.
pub fn resource(apply_to: &FirewallApplyTo) -> Result<FirewallResource> {
    match apply_to.kind {
        FirewallApplyToType::Server => {
            let id = apply_to.server_id.ok_or(ConvertError::MissingField {
                kind: "server",
                field: "serverId",
            })?;
            Ok(FirewallResource::Server {
                server: IdRef { id },
            })
        }
        FirewallApplyToType::LabelSelector => {
            let labels = apply_to.labels.as_ref().ok_or(ConvertError::MissingField {
                kind: "label_selector",
                field: "labels",
            })?;
            Ok(FirewallResource::LabelSelector {
                label_selector: SelectorRef {
                    selector: to_selector(labels),
                },
            })
        }
    }
}

pub fn resources(apply_to: &[FirewallApplyTo]) -> Result<Vec<FirewallResource>> {
    apply_to.iter().map(resource).collect()
}
