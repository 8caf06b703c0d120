//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the image relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Upstream content store location.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Size limits for identifiers, headers and bodies.
    pub limits: LimitsConfig,

    /// Extension fallback policy.
    pub resolver: ResolverConfig,

    /// Downstream response settings.
    pub response: ResponseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 1024,
        }
    }
}

/// Upstream content store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Hostname of the content store (resolved on every connect).
    pub host: String,

    /// Port of the content store.
    pub port: u16,

    /// Public-object namespace every candidate path is requested under.
    pub path_prefix: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: "cdn_zipline".to_string(),
            port: 3000,
            path_prefix: "/u/".to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Value sent in the `Host` header of upstream requests.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Per-operation read/write timeout in seconds.
    pub io_secs: u64,

    /// How long in-flight connections may drain after shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            io_secs: 10,
            shutdown_grace_secs: 10,
        }
    }
}

/// Size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Longest identifier accepted from a client.
    pub max_id_length: usize,

    /// Largest downstream request head (request line + headers).
    pub max_request_head_bytes: usize,

    /// Largest upstream response head before the fetch is abandoned.
    pub max_response_head_bytes: usize,

    /// Body streaming chunk size.
    pub chunk_size: usize,

    /// Largest `Content-Length` the relay agrees to stream.
    pub max_image_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_id_length: 100,
            max_request_head_bytes: 8 * 1024,
            max_response_head_bytes: 4 * 1024,
            chunk_size: 8 * 1024,
            max_image_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Extension fallback policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Extensions appended to bare identifiers, in priority order.
    pub extensions: Vec<String>,

    /// Suffixes that mark an identifier as already qualified.
    pub recognized_suffixes: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".webp".into(), ".png".into(), ".jpg".into()],
            recognized_suffixes: vec![
                ".webp".into(),
                ".png".into(),
                ".jpg".into(),
                ".jpeg".into(),
            ],
        }
    }
}

/// Downstream response settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// `max-age` advertised in the `Cache-Control` header of relayed images.
    pub cache_max_age_secs: u64,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            cache_max_age_secs: 3600,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per event, for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
