//! CIDR and IP address parsing.

use std::net::IpAddr;

use ipnet::IpNet;

use super::{ConvertError, Result};

/// Parse a CIDR into its network, dropping host bits (`10.0.0.5/24` becomes
/// `10.0.0.0/24`).
pub fn parse_cidr(value: &str) -> Result<IpNet> {
    value
        .trim()
        .parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|e| ConvertError::InvalidCidr {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a list of CIDRs, failing on the first invalid entry.
pub fn parse_cidrs(values: &[String]) -> Result<Vec<IpNet>> {
    values.iter().map(|v| parse_cidr(v)).collect()
}

pub fn parse_ip(value: &str) -> Result<IpAddr> {
    value
        .trim()
        .parse::<IpAddr>()
        .map_err(|e| ConvertError::InvalidIp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
