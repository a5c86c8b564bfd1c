use serde::{Deserialize, Serialize};

use super::{DriftCheck, ResourceSpec};
use crate::labels::Labels;
use crate::provider::PlacementGroupType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementGroupSpec {
    #[serde(default)]
    pub labels: Labels,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: PlacementGroupType,
}

fn default_kind() -> PlacementGroupType {
    PlacementGroupType::Spread
}

impl Default for PlacementGroupSpec {
    fn default() -> Self {
        Self {
            labels: Labels::new(),
            kind: default_kind(),
        }
    }
}

impl DriftCheck for PlacementGroupSpec {
    // The type cannot change after creation.
    fn is_up_to_date(&self, last_applied: &Self) -> bool {
        self.labels == last_applied.labels
    }
}

impl ResourceSpec for PlacementGroupSpec {
    const KIND: &'static str = "placement_group";
}
