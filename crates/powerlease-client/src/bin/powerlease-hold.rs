//! powerlease-hold - run a command while holding a lease
//!
//! Blocks until the managed machine is online, runs the command, then lets
//! the lease lapse. Exits with the command's status.

use clap::Parser;
use powerlease_client::{HttpLeaseApi, LeaseHandle, LeaseHandleConfig};
use powerlease_util::LeaseId;
use std::process::{Command, ExitCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// powerlease-hold - Keep the managed machine on while a command runs
#[derive(Parser, Debug)]
#[command(name = "powerlease-hold")]
#[command(about = "Keep the managed machine on while a command runs", long_about = None)]
struct Args {
    /// powerleased base URL (or set POWERLEASE_SERVER env var)
    #[arg(short, long, env = "POWERLEASE_SERVER", default_value = "http://localhost:8000")]
    server: String,

    /// Lease id to renew (default: let the server pick one)
    #[arg(long)]
    id: Option<String>,

    /// Renewal period in seconds
    #[arg(long, default_value_t = 60)]
    update_each: u64,

    /// Lease TTL in seconds
    #[arg(long, default_value_t = 180)]
    expire_in: u64,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Command to run once the machine is online
    #[arg(required = true, trailing_var_arg = true)]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let Some((program, rest)) = args.command.split_first() else {
        error!("No command given");
        return ExitCode::from(2);
    };

    let api = match HttpLeaseApi::new(&args.server) {
        Ok(api) => api,
        Err(e) => {
            error!(error = %e, "Failed to create HTTP client");
            return ExitCode::from(2);
        }
    };

    let handle = LeaseHandle::new(
        Arc::new(api),
        LeaseHandleConfig {
            lease_id: args.id.map(LeaseId::new),
            update_each: Duration::from_secs(args.update_each),
            expire_in: Duration::from_secs(args.expire_in),
            ..Default::default()
        },
    );
    if let Err(e) = handle.start() {
        error!(error = %e, "Failed to start lease refresher");
        return ExitCode::from(2);
    }

    info!(server = %args.server, "Waiting for machine");
    if let Err(e) = handle.acquire() {
        error!(error = %e, "Failed to acquire lease");
        return ExitCode::from(2);
    }
    info!(lease_id = ?handle.lease_id(), "Machine online, running command");

    let status = Command::new(program).args(rest).status();

    handle.release();
    handle.stop();

    match status {
        Ok(status) => match status.code() {
            Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
            None => {
                error!(%status, "Command terminated by signal");
                ExitCode::from(1)
            }
        },
        Err(e) => {
            error!(program = %program, error = %e, "Failed to run command");
            ExitCode::from(127)
        }
    }
}
