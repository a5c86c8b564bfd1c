//! Load balancer service and target conversion.

use super::cidr::parse_ip;
use super::{ConvertError, Result};
use crate::labels::to_selector;
use crate::provider::{
    HealthCheck, HealthCheckHttp, IdRef, IpRef, LoadBalancerService, LoadBalancerTarget,
    SelectorRef, ServiceHttp, TargetRef,
};
use crate::spec::{HealthCheckSpec, ServiceHttpSpec, ServiceSpec, TargetSpec, TargetType};

pub fn service(spec: &ServiceSpec) -> LoadBalancerService {
    LoadBalancerService {
        protocol: spec.protocol,
        listen_port: spec.listen_port,
        destination_port: spec.destination_port,
        proxy_protocol: spec.proxy_protocol,
        health_check: health_check(&spec.health_check),
        http: spec.http.as_ref().map(service_http),
    }
}

pub fn services(specs: &[ServiceSpec]) -> Vec<LoadBalancerService> {
    specs.iter().map(service).collect()
}

fn health_check(spec: &HealthCheckSpec) -> HealthCheck {
    HealthCheck {
        protocol: spec.protocol,
        port: spec.port,
        interval: spec.interval.map(|d| d.as_secs()),
        timeout: spec.timeout.map(|d| d.as_secs()),
        retries: spec.retries,
        http: spec.http.as_ref().map(|http| HealthCheckHttp {
            domain: http.domain.clone(),
            path: http.path.clone(),
            response: http.response.clone(),
            status_codes: http.status_codes.clone(),
            tls: http.tls,
        }),
    }
}

fn service_http(spec: &ServiceHttpSpec) -> ServiceHttp {
    ServiceHttp {
        cookie_name: spec.cookie_name.clone(),
        cookie_lifetime: spec.cookie_lifetime.map(|d| d.as_secs()),
        certificates: spec.certificate_ids.clone(),
        redirect_http: spec.redirect_http,
        sticky_sessions: spec.sticky_sessions,
    }
}

/// Convert a target. Private addressing is only requested when the load
/// balancer sits in a network.
pub fn target(spec: &TargetSpec, network_attached: bool) -> Result<LoadBalancerTarget> {
    let use_private_ip = Some(network_attached && spec.use_private_ip);

    match spec.kind {
        TargetType::Server => {
            let id = spec.server_id.ok_or(ConvertError::MissingField {
                kind: "server",
                field: "serverId",
            })?;
            Ok(LoadBalancerTarget {
                target: TargetRef::Server {
                    server: IdRef { id },
                },
                use_private_ip,
            })
        }
        TargetType::LabelSelector => {
            let labels = spec.labels.as_ref().ok_or(ConvertError::MissingField {
                kind: "label_selector",
                field: "labels",
            })?;
            Ok(LoadBalancerTarget {
                target: TargetRef::LabelSelector {
                    label_selector: SelectorRef {
                        selector: to_selector(labels),
                    },
                },
                use_private_ip,
            })
        }
        TargetType::Ip => {
            let ip = spec.ip.as_deref().ok_or(ConvertError::MissingField {
                kind: "ip",
                field: "ip",
            })?;
            Ok(LoadBalancerTarget {
                target: TargetRef::Ip {
                    ip: IpRef {
                        ip: parse_ip(ip)?.to_string(),
                    },
                },
                use_private_ip: None,
            })
        }
    }
}

pub fn targets(specs: &[TargetSpec], network_attached: bool) -> Result<Vec<LoadBalancerTarget>> {
    specs
        .iter()
        .map(|spec| target(spec, network_attached))
        .collect()
}
