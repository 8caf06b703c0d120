//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap socket operations with a deadline
//! - Carry the connect and per-operation limits derived from config
//! - Cancel operations cleanly on timeout (the future is dropped)
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::TimeoutConfig;

/// An operation did not complete within its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {0:?}")]
pub struct TimedOut(pub Duration);

/// Deadlines applied to a single upstream or downstream exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// Bound on establishing a TCP connection.
    pub connect: Duration,
    /// Bound on each individual read or write.
    pub io: Duration,
}

impl Deadlines {
    pub fn new(connect: Duration, io: Duration) -> Self {
        Self { connect, io }
    }
}

impl From<&TimeoutConfig> for Deadlines {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_secs),
            io: Duration::from_secs(config.io_secs),
        }
    }
}

impl Default for Deadlines {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

/// Run `fut` to completion or fail with [`TimedOut`] after `limit`.
pub async fn within<F>(limit: Duration, fut: F) -> Result<F::Output, TimedOut>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TimedOut(limit))
}

/// Write all of `buf` to `sink`, failing with `ErrorKind::TimedOut` past `limit`.
pub async fn write_within<W>(limit: Duration, sink: &mut W, buf: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    within(limit, sink.write_all(buf))
        .await
        .map_err(timed_out_io)
        .and_then(|r| r)
}

/// Express a deadline expiry as an I/O error.
pub fn timed_out_io(err: TimedOut) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, err)
}
