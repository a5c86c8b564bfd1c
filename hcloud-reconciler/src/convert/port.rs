//! Firewall port formatting.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Port restriction of a firewall rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallPort {
    #[serde(default)]
    pub all: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u16>,
}

impl FirewallPort {
    pub fn any() -> Self {
        Self {
            all: true,
            ..Default::default()
        }
    }

    pub fn single(port: u16) -> Self {
        Self {
            start: Some(port),
            ..Default::default()
        }
    }

    pub fn range(start: u16, end: u16) -> Self {
        Self {
            all: false,
            start: Some(start),
            end: Some(end),
        }
    }
}

impl fmt::Display for FirewallPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.all, self.start, self.end) {
            (true, _, _) | (false, None, _) => f.write_str("any"),
            (false, Some(start), Some(end)) if end != start => write!(f, "{}-{}", start, end),
            (false, Some(start), _) => write!(f, "{}", start),
        }
    }
}

/// Wire form of an optional port; no port means no restriction.
pub fn format_port(port: Option<&FirewallPort>) -> String {
    port.map(ToString::to_string)
        .unwrap_or_else(|| "any".to_string())
}
