//! hcloud-reconciler: converges declared Hetzner Cloud resources.
//!
//! Desired state is read from one JSON document per instance under
//! `<state-dir>/<kind>/`. The daemon:
//! - Observes each instance at the provider on every poll interval
//! - Creates, updates or deletes provider resources to match
//! - Records provider ids and last applied parameters back into the documents

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hcloud_reconciler::provider::http::DEFAULT_ENDPOINT;
use hcloud_reconciler::reconciler::{
    FirewallController, LoadBalancerController, NetworkController, PlacementGroupController,
    ServerController, VolumeController,
};
use hcloud_reconciler::{
    ActionWaiter, Cloud, FileStore, HcloudClient, Manager, ManagerOptions, ResourceSpec,
    ResourceStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Network,
    Server,
    Firewall,
    #[value(name = "load_balancer")]
    LoadBalancer,
    Volume,
    #[value(name = "placement_group")]
    PlacementGroup,
}

/// Hetzner Cloud reconciler
#[derive(Parser, Debug)]
#[command(name = "hcloud-reconciler", version, about)]
struct Args {
    /// Hetzner Cloud API token
    #[arg(long, env = "HCLOUD_TOKEN", hide_env_values = true)]
    token: String,

    /// Hetzner Cloud API endpoint
    #[arg(long, env = "HCLOUD_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Directory holding one subdirectory of instance documents per kind
    #[arg(long, env = "RECONCILER_STATE_DIR", default_value = "/var/lib/hcloud-reconciler")]
    state_dir: std::path::PathBuf,

    /// Seconds between full reconcile passes
    #[arg(long, env = "RECONCILER_POLL_INTERVAL", default_value = "60")]
    poll_interval: u64,

    /// Seconds to wait for a provider action before giving up
    #[arg(long, env = "RECONCILER_ACTION_TIMEOUT", default_value = "60")]
    action_timeout: u64,

    /// Milliseconds between provider action polls
    #[arg(long, env = "RECONCILER_ACTION_POLL_INTERVAL", default_value = "1000")]
    action_poll_interval: u64,

    /// Resource kinds to reconcile (defaults to all)
    #[arg(long, env = "RECONCILER_KINDS", value_enum, value_delimiter = ',')]
    kinds: Vec<Kind>,
}

async fn open_store<S: ResourceSpec>(state_dir: &Path) -> Result<Arc<dyn ResourceStore<S>>> {
    let dir = state_dir.join(S::KIND);
    let store = FileStore::<S>::open(&dir)
        .await
        .with_context(|| format!("Failed to open state directory {}", dir.display()))?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hcloud_reconciler=info,reqwest=warn,hyper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let kinds = if args.kinds.is_empty() {
        Kind::value_variants().to_vec()
    } else {
        args.kinds.clone()
    };

    info!("Starting hcloud-reconciler");
    info!("API endpoint: {}", args.endpoint);
    info!("State directory: {}", args.state_dir.display());

    let client = HcloudClient::with_endpoint(&args.endpoint, &args.token)
        .context("Failed to build API client")?;
    let waiter = ActionWaiter::new(
        Duration::from_millis(args.action_poll_interval),
        Duration::from_secs(args.action_timeout),
    );
    let cloud = Cloud::new(Arc::new(client), waiter);

    let mut manager = Manager::new(ManagerOptions {
        poll_interval: Duration::from_secs(args.poll_interval),
    });
    for kind in kinds {
        let state_dir = args.state_dir.as_path();
        let cloud = cloud.clone();
        manager = match kind {
            Kind::Network => {
                manager.register(NetworkController::new(cloud), open_store(state_dir).await?)
            }
            Kind::Server => {
                manager.register(ServerController::new(cloud), open_store(state_dir).await?)
            }
            Kind::Firewall => {
                manager.register(FirewallController::new(cloud), open_store(state_dir).await?)
            }
            Kind::LoadBalancer => manager.register(
                LoadBalancerController::new(cloud),
                open_store(state_dir).await?,
            ),
            Kind::Volume => {
                manager.register(VolumeController::new(cloud), open_store(state_dir).await?)
            }
            Kind::PlacementGroup => manager.register(
                PlacementGroupController::new(cloud),
                open_store(state_dir).await?,
            ),
        };
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let manager_handle = tokio::spawn(manager.run(shutdown_rx));

    // Wait for shutdown signal
    let ctrl_c = signal::ctrl_c();
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }

    let _ = shutdown_tx.send(true);
    manager_handle
        .await
        .context("Reconcile loop terminated abnormally")?;

    info!("Shutdown complete");
    Ok(())
}
