//! Label handling for provider-side resources.
//!
//! Every resource this crate writes carries two system labels: one marking
//! the resource as managed by the reconciler and one recording when the labels
//! were generated. Caller labels pass through untouched, except that they can
//! never replace a system label.

use std::collections::BTreeMap;

/// Label map as sent to and received from the provider.
pub type Labels = BTreeMap<String, String>;

/// Label key identifying resources owned by this reconciler.
pub const MANAGED_BY_LABEL: &str = "hcloud-reconciler/managed-by";
/// Value of [`MANAGED_BY_LABEL`].
pub const MANAGED_BY: &str = "hcloud-reconciler";
/// Label key holding the unix timestamp the labels were generated at.
pub const GENERATED_AT_LABEL: &str = "hcloud-reconciler/generated-at";

/// Merge caller labels with the system labels, stamped with the current time.
pub fn merge(desired: &Labels) -> Labels {
    merge_at(desired, chrono::Utc::now().timestamp())
}

/// Merge caller labels with the system labels for a fixed timestamp.
pub fn merge_at(desired: &Labels, generated_at: i64) -> Labels {
    let mut labels = desired.clone();
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string());
    labels.insert(GENERATED_AT_LABEL.to_string(), generated_at.to_string());
    labels
}

/// Render a label map as a provider label selector (`k=v,k2=v2`).
pub fn to_selector(labels: &Labels) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}
