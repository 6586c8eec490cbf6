//! Config validation CLI tool
//!
//! Validates a powerleased configuration file and reports any errors.

use powerlease_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a powerleased configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match powerlease_config::load_config(&config_path) {
        Ok(settings) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", powerlease_config::CURRENT_CONFIG_VERSION);
            println!("  Listen: {}", settings.daemon.listen);
            println!("  Data dir: {}", settings.daemon.data_dir.display());
            println!();
            println!("Machine:");
            println!("  Host: {}", settings.machine.host);
            println!("  MAC: {}", settings.machine.mac);
            println!(
                "  Probe: tcp/{} ({}ms)",
                settings.machine.probe_port,
                settings.machine.probe_timeout.as_millis()
            );
            println!("  Wake-on-LAN target: {}", settings.machine.broadcast);
            println!("  Shutdown: {}", settings.machine.shutdown_command.join(" "));
            println!();
            println!("Leases:");
            println!("  Default TTL: {}", format_duration(settings.leases.default_ttl));
            println!("  Grace period: {}", format_duration(settings.leases.grace_period));
            println!("  Poll interval: {}", format_duration(settings.leases.poll_interval));
            println!("  Idle interval: {}", format_duration(settings.leases.idle_interval));

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                powerlease_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                powerlease_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                powerlease_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                powerlease_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        powerlease_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
