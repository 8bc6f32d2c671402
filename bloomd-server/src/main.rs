//! Thin binary wiring configuration, logging, the filter manager
//! (including its startup discovery) and the background flusher thread
//! together — without implementing the network front-end, which SPEC_FULL
//! §1 explicitly places out of scope. Modeled on `bpa-server`'s `main.rs`.

mod config;
mod flusher;

use std::{sync::Arc, time::Duration};
use trace_err::*;
use tracing::{error, info};

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging(log_level: Option<tracing::Level>) {
    use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = std::env::var("BLOOMD_LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse::<tracing::Level>().ok())
        .or(log_level)
        .unwrap_or(tracing::Level::INFO);

    let filter = EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::from_level(log_level).into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some((settings, config_source)) = config::init() else {
        return Ok(());
    };

    init_logging(settings.log_level);

    info!("{PKG_NAME} version {PKG_VERSION} starting...");
    info!("{config_source}");

    inner_main(settings).await.inspect_err(|e| error!("{e}"))
}

async fn inner_main(settings: config::Settings) -> anyhow::Result<()> {
    std::fs::create_dir_all(&settings.data_dir)
        .trace_expect("failed to create filter data directory");

    let backend = Arc::new(bloomd_filter::LocalDiskFilterBackend::new(
        settings.data_dir.clone(),
    ));

    // Constructing the manager runs startup discovery (SPEC_FULL §4.8)
    // before any caller — including this binary's own flusher thread — is
    // admitted.
    let manager = Arc::new(bloomd_manager::FilterManager::new(
        settings.manager_config(),
        backend,
    ));
    info!(
        "loaded {} filter(s) from {}",
        manager.num_filters(),
        settings.data_dir.display()
    );

    let mut flusher = flusher::Flusher::spawn(
        manager.clone(),
        Duration::from_secs(settings.flush_interval_secs.max(1)),
    );

    info!("started successfully");

    wait_for_shutdown_signal().await;

    info!("stopping...");
    flusher.stop();
    manager.shutdown();
    info!("stopped");

    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .trace_expect("failed to register SIGTERM handler");
    #[cfg(not(unix))]
    let mut term = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received Ctrl+C, shutting down"),
        #[cfg(unix)]
        _ = term.recv() => info!("received SIGTERM, shutting down"),
        #[cfg(not(unix))]
        _ = &mut term => {}
    }
}
