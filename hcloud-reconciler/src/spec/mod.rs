//! Desired state per resource kind and the bookkeeping around it.
//!
//! A [`Managed`] instance pairs the caller's desired spec with the
//! [`Observed`] state the controllers maintain: the provider id and a copy of
//! the parameters last confirmed at the provider. Drift detection compares the
//! desired spec against that copy, never against live provider data.

pub mod firewall;
pub mod load_balancer;
pub mod network;
pub mod placement_group;
pub mod server;
pub mod volume;

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::provider::ResourceId;

pub use firewall::{FirewallApplyTo, FirewallApplyToType, FirewallRuleSpec, FirewallSpec};
pub use load_balancer::{
    HealthCheckHttpSpec, HealthCheckSpec, LoadBalancerSpec, ServiceHttpSpec, ServiceSpec,
    TargetSpec, TargetType,
};
pub use network::{NetworkSpec, RouteSpec, SubnetSpec};
pub use placement_group::PlacementGroupSpec;
pub use server::ServerSpec;
pub use volume::VolumeSpec;

/// Per-kind drift predicate.
pub trait DriftCheck {
    /// Whether the desired spec (`self`) matches what was last applied.
    fn is_up_to_date(&self, last_applied: &Self) -> bool;
}

/// A desired-state type the controllers can converge.
pub trait ResourceSpec:
    DriftCheck + Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Kind name used in logs and store layout.
    const KIND: &'static str;
}

/// State maintained by the controllers for one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "S: DeserializeOwned"))]
pub struct Observed<S> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_applied: Option<S>,
}

impl<S> Default for Observed<S> {
    fn default() -> Self {
        Self {
            provider_id: None,
            last_applied: None,
        }
    }
}

/// One declared resource instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "S: DeserializeOwned"))]
pub struct Managed<S> {
    pub name: String,
    pub spec: S,
    #[serde(default)]
    pub status: Observed<S>,
    #[serde(default)]
    pub deletion_requested: bool,
}

impl<S: ResourceSpec> Managed<S> {
    pub fn new(name: impl Into<String>, spec: S) -> Self {
        Self {
            name: name.into(),
            spec,
            status: Observed::default(),
            deletion_requested: false,
        }
    }

    /// Drift check against the last applied parameters; never applied means
    /// not up to date.
    pub fn is_up_to_date(&self) -> bool {
        self.status
            .last_applied
            .as_ref()
            .is_some_and(|last| self.spec.is_up_to_date(last))
    }

    /// Provider id, or an error naming `op` if the instance was never created.
    pub fn provider_id(&self, op: &'static str) -> Result<ResourceId, ReconcileError> {
        self.status
            .provider_id
            .ok_or_else(|| ReconcileError::NotCreated {
                op,
                kind: S::KIND,
                name: self.name.clone(),
            })
    }

    /// Last applied parameters, falling back to the desired spec.
    pub fn last_applied_or_spec(&self) -> &S {
        self.status.last_applied.as_ref().unwrap_or(&self.spec)
    }

    /// Record a confirmed creation.
    pub fn record_created(&mut self, id: ResourceId) {
        self.status.provider_id = Some(id);
        self.status.last_applied = Some(self.spec.clone());
    }

    /// Record parameters confirmed at the provider.
    pub fn record_applied(&mut self, applied: S) {
        self.status.last_applied = Some(applied);
    }

    /// Forget everything about the provider resource.
    pub fn record_deleted(&mut self) {
        self.status = Observed::default();
    }
}
