//! Serve command - run the tagwatch server
//!
//! Opens the tag store, applies seed registrations, then runs the beacon
//! listener, the HTTP API and (optionally) the embedded simulator until
//! SIGINT or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tagwatch_api::AppState;
use tagwatch_config::{Config, StoreConfig, TagSeed};
use tagwatch_protocol::BeaconParser;
use tagwatch_sources::{BeaconTcpSource, ListenerConfig};
use tagwatch_store::TagStore;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cmd::simulate::simulator_from_config;

/// Extra time granted on top of the grace period before giving up on a task
const SHUTDOWN_SLACK: Duration = Duration::from_secs(1);

/// Run the serve command
pub async fn run(config: Config, source: Option<PathBuf>) -> Result<()> {
    let config_path = source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %config_path,
        "tagwatch starting"
    );

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("tagwatch shutdown complete");
    Ok(())
}

/// Main server run loop
async fn run_server(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    let store = Arc::new(open_store(&config.store).await?);
    let seeded = seed_tags(&store, &config.tags).await?;
    if seeded > 0 {
        info!(count = seeded, "seed tags registered");
    }

    let parser = Arc::new(BeaconParser::new(config.parser.mode));
    let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

    // Beacon listener
    let listener_metrics = if config.listener.enabled {
        let source = BeaconTcpSource::new(
            listener_config(&config),
            Arc::clone(&parser),
            Arc::clone(&store),
        );
        let metrics = Arc::clone(source.metrics());
        let tcp = source.bind().await.context("failed to start beacon listener")?;

        let cancel = cancel.clone();
        tasks.push((
            "listener",
            tokio::spawn(async move {
                if let Err(e) = source.serve(tcp, cancel).await {
                    error!(error = %e, "beacon listener error");
                }
            }),
        ));
        Some(metrics)
    } else {
        info!("beacon listener disabled");
        None
    };

    // HTTP API
    if config.api.enabled {
        let mut state = AppState::new(Arc::clone(&store), Arc::clone(&parser));
        if let Some(metrics) = &listener_metrics {
            state = state.with_listener_metrics(Arc::clone(metrics));
        }

        let addr = config.api.bind_address();
        let tcp = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind API server to {}", addr))?;

        let cancel = cancel.clone();
        tasks.push((
            "api",
            tokio::spawn(async move {
                if let Err(e) = tagwatch_api::serve(tcp, state, cancel).await {
                    error!(error = %e, "API server error");
                }
            }),
        ));
    } else {
        info!("API server disabled");
    }

    // Embedded simulator
    if config.simulator.enabled {
        let simulator = simulator_from_config(&config.simulator, None)
            .context("invalid simulator configuration")?;

        let cancel = cancel.clone();
        tasks.push((
            "simulator",
            tokio::spawn(async move {
                if let Err(e) = simulator.run(cancel).await {
                    error!(error = %e, "simulator error");
                }
            }),
        ));
    }

    info!(
        listener = config.listener.enabled,
        listener_addr = %config.listener.bind_address(),
        api = config.api.enabled,
        api_addr = %config.api.bind_address(),
        simulator = config.simulator.enabled,
        parse_mode = parser.mode().as_str(),
        "tagwatch running"
    );

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping server...");
    cancel.cancel();

    let deadline = Instant::now() + config.shutdown.grace_period + SHUTDOWN_SLACK;
    join_until(tasks, deadline).await;

    Ok(())
}

/// Wait for every task against one shared deadline, aborting stragglers
///
/// Returns how many tasks had to be aborted.
async fn join_until(tasks: Vec<(&'static str, JoinHandle<()>)>, deadline: Instant) -> usize {
    let mut aborted = 0;
    for (name, mut task) in tasks {
        match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(task = name, error = %e, "task panicked during shutdown"),
            Err(_) => {
                warn!(task = name, "task did not finish within grace period");
                task.abort();
                aborted += 1;
            }
        }
    }
    aborted
}

/// Listener settings from the `[listener]` and `[shutdown]` sections
pub fn listener_config(config: &Config) -> ListenerConfig {
    let section = &config.listener;
    ListenerConfig {
        address: section.address.clone(),
        port: section.port,
        max_line_length: section.max_line_length,
        idle_timeout: section.idle_timeout,
        max_connections: section.max_connections,
        nodelay: section.nodelay,
        grace_period: config.shutdown.grace_period,
    }
}

async fn open_store(config: &StoreConfig) -> Result<TagStore> {
    if config.is_memory() {
        warn!("using in-memory tag store, state is lost on exit");
        return TagStore::new_memory()
            .await
            .context("failed to open in-memory tag store");
    }

    TagStore::open(&config.path)
        .await
        .with_context(|| format!("failed to open tag store at {}", config.path.display()))
}

/// Register every seed tag that is not registered yet
///
/// Returns how many were newly registered.
pub async fn seed_tags(store: &TagStore, seeds: &[TagSeed]) -> Result<usize> {
    let mut registered = 0;
    for seed in seeds {
        let added = store
            .register(&seed.id, &seed.description)
            .await
            .with_context(|| format!("failed to register seed tag {}", seed.id))?;
        if added {
            registered += 1;
        }
    }
    Ok(registered)
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
