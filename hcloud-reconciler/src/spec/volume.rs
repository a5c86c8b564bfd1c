use serde::{Deserialize, Serialize};

use super::{DriftCheck, ResourceSpec};
use crate::labels::Labels;
use crate::provider::{ResourceId, VolumeFormat};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    /// Size in GB.
    pub size: u32,
    #[serde(default)]
    pub automount: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<VolumeFormat>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<ResourceId>,
}

impl DriftCheck for VolumeSpec {
    /// Any size difference counts as drift, including a requested shrink that
    /// the controller will never apply.
    fn is_up_to_date(&self, last_applied: &Self) -> bool {
        self.labels == last_applied.labels
            && self.server_id == last_applied.server_id
            && self.size == last_applied.size
    }
}

impl ResourceSpec for VolumeSpec {
    const KIND: &'static str = "volume";
}
