//! Upstream content store subsystem.
//!
//! # Data Flow
//! ```text
//! CandidatePath
//!     → client.rs (connect, send GET /<prefix><path>, deadlines)
//!     → http/head.rs (bounded scan for \r\n\r\n)
//!     → response.rs (status, Content-Type, Content-Length checks)
//!     → UpstreamResponse (live connection at first body byte)
//!     → stream_body (exactly Content-Length bytes, chunked into a sink)
//! ```
//!
//! # Design Decisions
//! - One connection per attempt, always `Connection: close`
//! - Failures are classified, never propagated as fatal

pub mod client;
pub mod error;
pub mod response;

pub use client::{FetchedImage, UpstreamClient, UpstreamResponse};
pub use error::{BodyError, FetchError};
pub use response::ResponseHead;
