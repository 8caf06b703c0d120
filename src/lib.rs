//! Image relay library.
//!
//! Serves image assets by opaque ID, fetching them on demand from an
//! upstream content store over a minimal HTTP/1.1 client and streaming
//! them back to the requesting client.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod probe;
pub mod relay;
pub mod resilience;
pub mod upstream;

pub use config::RelayConfig;
pub use http::RelayServer;
pub use lifecycle::Shutdown;
pub use relay::RelayHandler;
pub use upstream::UpstreamClient;
