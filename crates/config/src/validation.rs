//! Configuration validation
//!
//! Validates config consistency:
//! - Listener and API do not bind the same socket
//! - Listener line limit is positive
//! - Simulator intervals, malformed ratio and tag count are usable
//! - Seed tags carry an id

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::simulator::MIN_SIMULATOR_TAGS;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_ports(config)?;
    validate_listener(config)?;
    validate_simulator(config)?;
    validate_tags(config)?;
    Ok(())
}

/// Hosts that bind every interface
fn is_wildcard(host: &str) -> bool {
    matches!(host, "" | "0.0.0.0" | "::" | "[::]")
}

fn addresses_overlap(a: &str, b: &str) -> bool {
    a == b || is_wildcard(a) || is_wildcard(b)
}

fn validate_ports(config: &Config) -> Result<()> {
    let listener = &config.listener;
    let api = &config.api;

    if listener.enabled
        && api.enabled
        && listener.port == api.port
        && listener.port != 0
        && addresses_overlap(&listener.address, &api.host)
    {
        return Err(ConfigError::PortConflict {
            port: listener.port,
        });
    }

    Ok(())
}

fn validate_listener(config: &Config) -> Result<()> {
    if config.listener.max_line_length == 0 {
        return Err(ConfigError::invalid_value(
            "listener",
            "max_line_length",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_simulator(config: &Config) -> Result<()> {
    let sim = &config.simulator;

    if sim.min_interval > sim.max_interval {
        return Err(ConfigError::invalid_value(
            "simulator",
            "min_interval",
            format!(
                "{:?} exceeds max_interval {:?}",
                sim.min_interval, sim.max_interval
            ),
        ));
    }

    if !(0.0..=1.0).contains(&sim.malformed_ratio) {
        return Err(ConfigError::invalid_value(
            "simulator",
            "malformed_ratio",
            "must be within 0.0..=1.0",
        ));
    }

    if sim.tags.len() < MIN_SIMULATOR_TAGS {
        return Err(ConfigError::invalid_value(
            "simulator",
            "tags",
            format!("at least {} tag ids required", MIN_SIMULATOR_TAGS),
        ));
    }

    if sim.tags.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::invalid_value(
            "simulator",
            "tags",
            "tag ids must not be empty",
        ));
    }

    Ok(())
}

fn validate_tags(config: &Config) -> Result<()> {
    if config.tags.iter().any(|seed| seed.id.trim().is_empty()) {
        return Err(ConfigError::invalid_value(
            "tags",
            "id",
            "seed tag ids must not be empty",
        ));
    }
    Ok(())
}
