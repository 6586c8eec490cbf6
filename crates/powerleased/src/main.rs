//! powerleased - The powerlease daemon
//!
//! This is the main entry point for the powerleased service.
//! It wires together all the components:
//! - Configuration loading
//! - Lease store initialization
//! - Power adapter (Linux)
//! - Power service and its reconciliation loop
//! - HTTP lease API

use anyhow::{Context, Result};
use clap::Parser;
use powerlease_config::{load_config, parse_socket_addr, Settings};
use powerlease_core::{PowerService, ServiceSettings};
use powerlease_host_linux::{LinuxPower, LinuxPowerConfig};
use powerlease_store::SqliteStore;
use powerlease_util::{default_config_path, is_mock_time_active, SystemClock, LEASE_DB_FILENAME};
use powerleased::http::router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// powerleased - Keep a machine powered on exactly while someone needs it
#[derive(Parser, Debug)]
#[command(name = "powerleased")]
#[command(about = "Lease-driven power manager for a single machine", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/powerlease/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// HTTP listen address override (or set POWERLEASE_LISTEN env var)
    #[arg(long, env = "POWERLEASE_LISTEN")]
    listen: Option<String>,

    /// Data directory override (or set POWERLEASE_DATA_DIR env var)
    #[arg(short, long, env = "POWERLEASE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn listen_addr(args: &Args, settings: &Settings) -> Result<SocketAddr> {
    match &args.listen {
        Some(listen) => parse_socket_addr(listen)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Invalid listen address {:?}", listen)),
        None => Ok(settings.daemon.listen),
    }
}

fn power_adapter(settings: &Settings) -> LinuxPower {
    let machine = &settings.machine;
    LinuxPower::new(LinuxPowerConfig {
        host: machine.host.clone(),
        mac: machine.mac,
        probe_port: machine.probe_port,
        broadcast: machine.broadcast,
        shutdown_command: machine.shutdown_command.clone(),
        shutdown_timeout: machine.shutdown_timeout,
    })
}

async fn run(args: Args) -> Result<()> {
    let settings = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    info!(
        config_path = %args.config.display(),
        host = %settings.machine.host,
        mac = %settings.machine.mac,
        "Configuration loaded"
    );

    let listen = listen_addr(&args, &settings)?;
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| settings.daemon.data_dir.clone());

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let db_path = data_dir.join(LEASE_DB_FILENAME);
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path))?,
    );
    info!(db_path = %db_path.display(), "Store initialized");

    let service = Arc::new(PowerService::new(
        store,
        Arc::new(power_adapter(&settings)),
        Arc::new(SystemClock),
        ServiceSettings::from(&settings),
    ));
    service.start().context("Failed to start power service")?;

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    info!(listen = %listen, "HTTP server started");

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            _ = sighup.recv() => info!("Received SIGHUP, shutting down gracefully"),
        }
    };

    let served = axum::serve(listener, router(service.clone()))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed");

    info!("Shutting down powerleased");
    service.stop().await;

    served
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "powerleased starting");

    if is_mock_time_active() {
        warn!(now = %powerlease_util::now(), "Mock time is active");
    }

    run(args).await
}
