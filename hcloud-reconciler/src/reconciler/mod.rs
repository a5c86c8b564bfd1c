//! Convergence controllers for the different resource kinds.
//!
//! Each controller compares the desired spec with what it last applied at the
//! provider and issues the provider calls needed to converge. A single pass
//! over one instance is driven by [`reconcile_once`]: observe, then delete,
//! create or update depending on what was observed.

pub mod firewall;
pub mod load_balancer;
pub mod network;
pub mod placement_group;
pub mod server;
pub mod volume;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audit::ReconcileAuditLogger;
use crate::error::Result;
use crate::spec::{Managed, ResourceSpec};
use crate::store::ResourceStore;

pub use firewall::FirewallController;
pub use load_balancer::LoadBalancerController;
pub use network::NetworkController;
pub use placement_group::PlacementGroupController;
pub use server::ServerController;
pub use volume::VolumeController;

/// Result of observing an instance at the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub exists: bool,
    pub up_to_date: bool,
}

impl Observation {
    pub fn absent() -> Self {
        Self {
            exists: false,
            up_to_date: false,
        }
    }

    pub fn present(up_to_date: bool) -> Self {
        Self {
            exists: true,
            up_to_date,
        }
    }
}

/// How to reach a freshly created resource.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    pub endpoint: String,
    pub username: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl fmt::Debug for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDetails")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Outcome of a successful [`Controller::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Creation {
    pub connection_details: Option<ConnectionDetails>,
}

/// Trait for resource controllers.
///
/// Controllers record confirmed provider state on the instance they are handed
/// (`status.provider_id`, `status.last_applied`); persisting it is up to the
/// caller.
#[async_trait]
pub trait Controller: Send + Sync + 'static {
    /// The desired-state type this controller converges.
    type Spec: ResourceSpec;

    /// Check whether the provider resource exists and matches the last
    /// applied parameters. "Not found" is not an error.
    async fn observe(&self, res: &Managed<Self::Spec>) -> Result<Observation>;

    /// Create the provider resource.
    async fn create(&self, res: &mut Managed<Self::Spec>) -> Result<Creation>;

    /// Converge an existing provider resource toward the desired spec.
    async fn update(&self, res: &mut Managed<Self::Spec>) -> Result<()>;

    /// Tear down the provider resource.
    async fn delete(&self, res: &mut Managed<Self::Spec>) -> Result<()>;
}

/// What a pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Created,
    Updated,
    UpToDate,
    Deleted,
    /// Deletion was requested but nothing existed at the provider.
    Forgotten,
    /// The instance is no longer in the store.
    Gone,
}

/// Run one reconcile pass for the instance `name`.
///
/// Any status change the controller recorded is persisted, also when the pass
/// fails part way, so a created resource is never lost track of.
pub async fn reconcile_once<C>(
    controller: &C,
    store: &dyn ResourceStore<C::Spec>,
    audit: &ReconcileAuditLogger,
    name: &str,
) -> Result<PassOutcome>
where
    C: Controller + ?Sized,
{
    let kind = C::Spec::KIND;
    let Some(mut res) = store.get(name).await? else {
        debug!(kind, name, "Instance gone, skipping");
        return Ok(PassOutcome::Gone);
    };

    let before = res.status.clone();
    let result = run_pass(controller, store, &mut res).await;

    if let Err(e) = &result {
        if res.status != before {
            if let Err(save) = store.save_status(name, &res.status).await {
                warn!(kind, name, "Failed to save partial status: {}", save);
            }
        }
        audit.failed(kind, name, e);
        return result;
    }

    match result {
        Ok(PassOutcome::Created) => {
            if let Some(id) = res.status.provider_id {
                audit.created(kind, name, id);
            }
        }
        Ok(PassOutcome::Updated) => {
            if let Some(id) = res.status.provider_id {
                audit.updated(kind, name, id);
            }
        }
        Ok(PassOutcome::Deleted) => audit.deleted(kind, name, before.provider_id),
        _ => {}
    }
    result
}

async fn run_pass<C>(
    controller: &C,
    store: &dyn ResourceStore<C::Spec>,
    res: &mut Managed<C::Spec>,
) -> Result<PassOutcome>
where
    C: Controller + ?Sized,
{
    let kind = C::Spec::KIND;
    let observation = controller.observe(res).await?;
    debug!(
        kind,
        name = %res.name,
        exists = observation.exists,
        up_to_date = observation.up_to_date,
        "Observed"
    );

    if res.deletion_requested {
        let outcome = if observation.exists {
            info!("Deleting {} {}", kind, res.name);
            controller.delete(res).await?;
            PassOutcome::Deleted
        } else {
            PassOutcome::Forgotten
        };
        store.finalize(&res.name).await?;
        return Ok(outcome);
    }

    if !observation.exists {
        if let Some(id) = res.status.provider_id {
            warn!("{} {} ({}) missing at provider, recreating", kind, res.name, id);
            res.record_deleted();
        }
        info!("Creating {} {}", kind, res.name);
        let creation = controller.create(res).await?;
        store.save_status(&res.name, &res.status).await?;
        if let Some(details) = creation.connection_details {
            store.publish_connection_details(&res.name, &details).await?;
        }
        return Ok(PassOutcome::Created);
    }

    if observation.up_to_date {
        return Ok(PassOutcome::UpToDate);
    }

    info!("Updating {} {}", kind, res.name);
    controller.update(res).await?;
    store.save_status(&res.name, &res.status).await?;
    Ok(PassOutcome::Updated)
}
