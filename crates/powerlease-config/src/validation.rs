//! Configuration validation

use crate::schema::{RawConfig, RawLeaseConfig, RawMachineConfig};
use powerlease_util::MacAddress;
use std::net::SocketAddr;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid address '{value}' for {field}: {message}")]
    InvalidAddress {
        field: String,
        value: String,
        message: String,
    },

    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(listen) = &config.daemon.listen {
        errors.extend(validate_socket_addr("daemon.listen", listen));
    }

    errors.extend(validate_machine(&config.machine));
    errors.extend(validate_leases(&config.leases));

    errors
}

fn validate_machine(machine: &RawMachineConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if machine.host.trim().is_empty() {
        errors.push(ValidationError::InvalidField {
            field: "machine.host".into(),
            message: "host cannot be empty".into(),
        });
    }

    if let Err(e) = machine.mac.parse::<MacAddress>() {
        errors.push(ValidationError::InvalidField {
            field: "machine.mac".into(),
            message: e.to_string(),
        });
    }

    if machine.probe_port == Some(0) {
        errors.push(ValidationError::MustBePositive {
            field: "machine.probe_port".into(),
        });
    }

    if let Some(broadcast) = &machine.broadcast {
        match parse_socket_addr(broadcast) {
            Ok(addr) if addr.is_ipv4() => {}
            result => errors.push(ValidationError::InvalidAddress {
                field: "machine.broadcast".into(),
                value: broadcast.clone(),
                message: result
                    .err()
                    .unwrap_or_else(|| "Wake-on-LAN target must be IPv4".into()),
            }),
        }
    }

    if let Some(argv) = &machine.shutdown_command
        && argv.first().is_none_or(|program| program.trim().is_empty())
    {
        errors.push(ValidationError::InvalidField {
            field: "machine.shutdown_command".into(),
            message: "command cannot be empty".into(),
        });
    }

    errors.extend(positive("machine.probe_timeout_ms", machine.probe_timeout_ms));
    errors.extend(positive(
        "machine.shutdown_timeout_seconds",
        machine.shutdown_timeout_seconds,
    ));

    errors
}

fn validate_leases(leases: &RawLeaseConfig) -> Vec<ValidationError> {
    // A zero grace period is allowed: shut down on the first idle tick
    [
        positive("leases.default_ttl_seconds", leases.default_ttl_seconds),
        positive("leases.poll_interval_seconds", leases.poll_interval_seconds),
        positive("leases.idle_interval_seconds", leases.idle_interval_seconds),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn positive(field: &str, value: Option<u64>) -> Option<ValidationError> {
    (value == Some(0)).then(|| ValidationError::MustBePositive {
        field: field.to_string(),
    })
}

fn validate_socket_addr(field: &str, value: &str) -> Option<ValidationError> {
    parse_socket_addr(value)
        .err()
        .map(|message| ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
            message,
        })
}

/// Parse an `ip:port` address
pub fn parse_socket_addr(s: &str) -> Result<SocketAddr, String> {
    s.parse::<SocketAddr>()
        .map_err(|e| format!("expected ip:port ({})", e))
}
