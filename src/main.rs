//! health-watch CLI
//!
//! ```text
//!   ┌──────────────┐   tick / refresh   ┌──────────────┐   GET /health   ┌─────────┐
//!   │ HealthPoller │ ─────────────────▶ │ HttpTransport│ ──────────────▶ │ backend │
//!   └──────┬───────┘ ◀───────────────── └──────────────┘ ◀────────────── └─────────┘
//!          │ fold snapshot
//!          ├──▶ FileSnapshotStore (per-session JSON slot)
//!          ├──▶ DebugMirror ─────────┐
//!          └──▶ TrackerFeed ──▶ ConnectionTracker
//!                                    │
//!                          admin router (/status, /debug, /tracker, ...)
//! ```
//!
//! `check` runs one probe and exits with 0 (online), 1 (degraded) or
//! 2 (offline). `watch` polls until Ctrl-C, hot-reloading the config file.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use health_watch::admin::{setup_admin_router, AppState, TrackerFeed};
use health_watch::config::watcher::ConfigWatcher;
use health_watch::config::{load_config, WatchConfig};
use health_watch::health::{
    CheckOverrides, DebugMirror, FileSnapshotStore, HealthPoller, HealthStatus, PollerObserver,
};
use health_watch::observability::{logging, metrics};
use health_watch::tracker::ConnectionTracker;
use health_watch::transport::{HttpTransport, TransportError};
use health_watch::Shutdown;

#[derive(Parser)]
#[command(name = "health-watch")]
#[command(about = "Poll a backend health endpoint and track its status", long_about = None)]
struct Cli {
    /// TOML config file; built-in defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single check and print the snapshot as JSON
    Check {
        /// Probe this endpoint instead of the configured one
        #[arg(short, long)]
        endpoint: Option<String>,
    },
    /// Poll continuously until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WatchConfig::default(),
    };
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.poller.endpoint,
        "health-watch starting"
    );

    match cli.command {
        Commands::Check { endpoint } => check(config, endpoint).await,
        Commands::Watch => {
            watch(config, cli.config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_poller(
    config: &WatchConfig,
    observers: &[Arc<dyn PollerObserver>],
) -> Result<HealthPoller, TransportError> {
    let transport = Arc::new(HttpTransport::from_config(config)?);
    let store = FileSnapshotStore::from_config(&config.storage);
    tracing::debug!(
        path = %store.path().display(),
        session = store.session_id(),
        "Snapshot store ready"
    );

    let mut builder = HealthPoller::builder(transport)
        .config(config.poller.clone())
        .store(Arc::new(store));
    for observer in observers {
        builder = builder.observer(observer.clone());
    }
    Ok(builder.build())
}

async fn check(mut config: WatchConfig, endpoint: Option<String>) -> Result<ExitCode, Box<dyn Error>> {
    config.poller.auto_start = false;
    let poller = build_poller(&config, &[])?;

    let snapshot = poller
        .refresh(Some(CheckOverrides {
            endpoint,
            ..CheckOverrides::default()
        }))
        .await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(match snapshot.status {
        HealthStatus::Online => ExitCode::SUCCESS,
        HealthStatus::Degraded => ExitCode::from(1),
        HealthStatus::Offline | HealthStatus::Checking => ExitCode::from(2),
    })
}

async fn watch(mut config: WatchConfig, config_path: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    // Pinned for the process; the config watcher stamps it on every reload.
    let session_id = config
        .storage
        .session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    config.storage.session_id = Some(session_id.clone());

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mirror = Arc::new(DebugMirror::new());
    let tracker = Arc::new(Mutex::new(ConnectionTracker::from_config(&config.tracker)));
    let observers: Vec<Arc<dyn PollerObserver>> = vec![
        mirror.clone(),
        Arc::new(TrackerFeed::new(tracker.clone())),
    ];

    let initial = build_poller(&config, &observers)?;
    if !initial.is_running() {
        initial.start();
    }
    let poller = Arc::new(ArcSwap::from_pointee(initial));
    let shutdown = Shutdown::new();

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin endpoint listening");

        let router = setup_admin_router(AppState {
            poller: poller.clone(),
            mirror: mirror.clone(),
            tracker: tracker.clone(),
        });
        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin server failed");
            }
        });
    }

    // The watcher handle must outlive the loop below.
    let (_watcher, mut updates) = match &config_path {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.with_session(session_id.clone()).run()?), rx)
        }
        None => {
            let (_, rx) = mpsc::unbounded_channel();
            (None, rx)
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down");
                break;
            }
            Some(next_config) = updates.recv() => {
                match build_poller(&next_config, &observers) {
                    Ok(next) => {
                        if !next.is_running() {
                            next.start();
                        }
                        let previous = poller.swap(Arc::new(next));
                        previous.dispose();
                        tracing::info!(
                            endpoint = %next_config.poller.endpoint,
                            "Configuration reloaded, poller restarted"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to apply reloaded config, keeping current poller");
                    }
                }
            }
        }
    }

    shutdown.trigger();
    poller.load().dispose();
    tracing::info!("Shutdown complete");
    Ok(())
}
