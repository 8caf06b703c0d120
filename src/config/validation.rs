//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid, limits > 0)
//! - Check that resolver extensions can never produce an invalid identifier
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RelayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human readable reason.
    pub reason: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be > 0"));
    }

    let upstream = &config.upstream;
    if upstream.host.trim().is_empty() {
        errors.push(ValidationError::new("upstream.host", "must not be empty"));
    }
    if upstream.port == 0 {
        errors.push(ValidationError::new("upstream.port", "must be > 0"));
    }
    if !upstream.path_prefix.starts_with('/') || !upstream.path_prefix.ends_with('/') {
        errors.push(ValidationError::new(
            "upstream.path_prefix",
            "must start and end with '/'",
        ));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.io_secs", timeouts.io_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be > 0"));
        }
    }

    let limits = &config.limits;
    for (field, value) in [
        ("limits.max_id_length", limits.max_id_length),
        ("limits.max_request_head_bytes", limits.max_request_head_bytes),
        ("limits.chunk_size", limits.chunk_size),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be > 0"));
        }
    }
    // The smallest possible head is the bare "\r\n\r\n" terminator.
    if limits.max_response_head_bytes < 4 {
        errors.push(ValidationError::new(
            "limits.max_response_head_bytes",
            "must be >= 4",
        ));
    }
    if limits.max_image_bytes == 0 {
        errors.push(ValidationError::new("limits.max_image_bytes", "must be > 0"));
    }

    if config.resolver.extensions.is_empty() {
        errors.push(ValidationError::new(
            "resolver.extensions",
            "at least one extension is required",
        ));
    }
    for (field, list) in [
        ("resolver.extensions", &config.resolver.extensions),
        ("resolver.recognized_suffixes", &config.resolver.recognized_suffixes),
    ] {
        for ext in list {
            if !is_valid_extension(ext) {
                errors.push(ValidationError::new(
                    field,
                    format!("'{ext}' must be '.' followed by letters or digits"),
                ));
            }
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_extension(ext: &str) -> bool {
    match ext.strip_prefix('.') {
        Some(rest) => !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric()),
        None => false,
    }
}
