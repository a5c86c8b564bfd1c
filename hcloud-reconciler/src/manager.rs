//! Reconcile loop driving every registered controller.
//!
//! Each resource kind gets its own task. A task wakes up on the poll interval
//! and on store change notifications, and runs one pass per instance. Passes
//! for different instances run concurrently, a given instance never has more
//! than one pass in flight.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::audit::ReconcileAuditLogger;
use crate::error::Result;
use crate::reconciler::{reconcile_once, Controller, PassOutcome};
use crate::spec::ResourceSpec;
use crate::store::{self, ResourceStore};

/// Default interval between full passes over a kind.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub poll_interval: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// ============================================================================
// Workers
// ============================================================================

/// A controller bound to its store, with the spec type erased.
#[async_trait]
trait Worker: Send + Sync {
    fn kind(&self) -> &'static str;

    async fn list(&self) -> store::Result<Vec<String>>;

    fn subscribe(&self) -> broadcast::Receiver<String>;

    async fn reconcile(&self, name: &str) -> Result<PassOutcome>;
}

struct KindWorker<C: Controller> {
    controller: C,
    store: Arc<dyn ResourceStore<C::Spec>>,
    audit: ReconcileAuditLogger,
}

#[async_trait]
impl<C: Controller> Worker for KindWorker<C> {
    fn kind(&self) -> &'static str {
        C::Spec::KIND
    }

    async fn list(&self) -> store::Result<Vec<String>> {
        self.store.list().await
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.store.subscribe()
    }

    async fn reconcile(&self, name: &str) -> Result<PassOutcome> {
        reconcile_once(&self.controller, self.store.as_ref(), &self.audit, name).await
    }
}

/// Removes an instance from the in-flight set when its pass ends, also when
/// the pass is aborted.
struct InFlight {
    set: Arc<Mutex<HashSet<String>>>,
    name: String,
}

impl InFlight {
    fn acquire(set: &Arc<Mutex<HashSet<String>>>, name: &str) -> Option<Self> {
        let mut guard = set.lock().unwrap_or_else(|e| e.into_inner());
        if !guard.insert(name.to_string()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            name: name.to_string(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut guard = self.set.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(&self.name);
    }
}

// ============================================================================
// Manager
// ============================================================================

pub struct Manager {
    options: ManagerOptions,
    audit: ReconcileAuditLogger,
    workers: Vec<Arc<dyn Worker>>,
}

impl Manager {
    pub fn new(options: ManagerOptions) -> Self {
        Self {
            options,
            audit: ReconcileAuditLogger::new("hcloud-reconciler"),
            workers: Vec::new(),
        }
    }

    pub fn with_audit(mut self, audit: ReconcileAuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// Register a controller together with the store holding its instances.
    pub fn register<C: Controller>(
        mut self,
        controller: C,
        store: Arc<dyn ResourceStore<C::Spec>>,
    ) -> Self {
        self.workers.push(Arc::new(KindWorker {
            controller,
            store,
            audit: self.audit.clone(),
        }));
        self
    }

    /// Kinds registered so far, in registration order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.workers.iter().map(|w| w.kind()).collect()
    }

    /// Run until `shutdown` flips to `true` or its sender goes away.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        info!(
            kinds = ?self.kinds(),
            poll_interval = ?self.options.poll_interval,
            "Starting reconcile loop"
        );

        let mut kinds = JoinSet::new();
        for worker in self.workers {
            kinds.spawn(run_kind(
                worker,
                self.options.poll_interval,
                shutdown.clone(),
            ));
        }

        while let Some(joined) = kinds.join_next().await {
            if let Err(e) = joined {
                error!("Reconcile task failed: {}", e);
            }
        }

        info!("Reconcile loop stopped");
    }
}

async fn run_kind(
    worker: Arc<dyn Worker>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let kind = worker.kind();
    let in_flight = Arc::new(Mutex::new(HashSet::new()));
    let mut passes = JoinSet::new();

    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut events = worker.subscribe();
    let mut events_open = true;

    if *shutdown.borrow() {
        return;
    }

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                spawn_all(&worker, &in_flight, &mut passes).await;
            }
            event = events.recv(), if events_open => match event {
                Ok(name) => spawn_pass(&worker, &in_flight, &mut passes, name),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(kind, skipped, "Missed change notifications, reconciling all");
                    spawn_all(&worker, &in_flight, &mut passes).await;
                }
                Err(RecvError::Closed) => {
                    debug!(kind, "Change notifications closed");
                    events_open = false;
                }
            },
            Some(joined) = passes.join_next() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!(kind, "Reconcile pass panicked: {}", e);
                    }
                }
            }
        }
    }

    debug!(kind, in_flight = passes.len(), "Stopping, aborting passes");
    passes.abort_all();
    while passes.join_next().await.is_some() {}
}

async fn spawn_all(
    worker: &Arc<dyn Worker>,
    in_flight: &Arc<Mutex<HashSet<String>>>,
    passes: &mut JoinSet<()>,
) {
    match worker.list().await {
        Ok(names) => {
            for name in names {
                spawn_pass(worker, in_flight, passes, name);
            }
        }
        Err(e) => warn!(kind = worker.kind(), "Failed to list instances: {}", e),
    }
}

fn spawn_pass(
    worker: &Arc<dyn Worker>,
    in_flight: &Arc<Mutex<HashSet<String>>>,
    passes: &mut JoinSet<()>,
    name: String,
) {
    let kind = worker.kind();
    let Some(guard) = InFlight::acquire(in_flight, &name) else {
        debug!(kind, name = %name, "Pass already in flight, skipping");
        return;
    };

    let worker = Arc::clone(worker);
    passes.spawn(async move {
        let _guard = guard;
        match worker.reconcile(&name).await {
            Ok(outcome) => debug!(kind, name = %name, ?outcome, "Pass finished"),
            Err(e) if e.is_retryable() => {
                warn!(kind, name = %name, "Pass failed, retrying next interval: {}", e)
            }
            Err(e) => error!(kind, name = %name, "Pass failed: {}", e),
        }
    });
}
