//! Translators from desired-state fields to provider request shapes.
//!
//! Everything in here is pure and fails fast: malformed input is reported as a
//! [`ConvertError`] and never retried.

pub mod cidr;
pub mod duration;
pub mod firewall;
pub mod load_balancer;
pub mod port;
pub mod ssh;

use thiserror::Error;

pub use duration::Duration;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("invalid CIDR {value:?}: {reason}")]
    InvalidCidr { value: String, reason: String },

    #[error("invalid IP address {value:?}: {reason}")]
    InvalidIp { value: String, reason: String },

    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("bad ssh key")]
    BadSshKey,

    #[error("invalid ssh key encoding: {0}")]
    SshKeyEncoding(String),

    #[error("datacenter and location not set")]
    MissingPlacement,

    #[error("{kind} target requires {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

/// Result type for conversions.
pub type Result<T> = std::result::Result<T, ConvertError>;
