//! Bounded HTTP head framing.
//!
//! # Responsibilities
//! - Read a request or response head up to and including `\r\n\r\n`
//! - Never consume bytes past the terminator (they belong to the body)
//! - Fail when the head outgrows its limit or the peer hangs up early
//!
//! # Design Decisions
//! - Works on any `AsyncBufRead`; bytes after the terminator stay in the
//!   reader's buffer and are returned by the next body read
//! - The limit includes the terminator itself

use std::io;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Marks the end of an HTTP head.
pub const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Failure while framing a head.
#[derive(Debug, Error)]
pub enum HeadError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    #[error("connection closed after {received} bytes, before end of head")]
    Incomplete { received: usize },

    #[error("head exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Read one head, returning its bytes including the terminator.
pub async fn read_head<R>(reader: &mut R, limit: usize) -> Result<Vec<u8>, HeadError>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = Vec::with_capacity(limit.min(1024));

    loop {
        let (consumed, complete) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Err(HeadError::Incomplete {
                    received: head.len(),
                });
            }
            scan(&mut head, available, limit)
        };
        reader.consume(consumed);

        match complete {
            Scan::Complete => return Ok(head),
            Scan::Overflow => return Err(HeadError::TooLarge { limit }),
            Scan::Partial => {}
        }
    }
}

enum Scan {
    Complete,
    Overflow,
    Partial,
}

/// Copy bytes from `available` into `head` until the terminator is seen or
/// `limit` is reached. Returns how many bytes were taken.
fn scan(head: &mut Vec<u8>, available: &[u8], limit: usize) -> (usize, Scan) {
    for (i, &byte) in available.iter().enumerate() {
        if head.len() == limit {
            return (i, Scan::Overflow);
        }
        head.push(byte);
        if byte == b'\n' && head.ends_with(HEAD_TERMINATOR) {
            return (i + 1, Scan::Complete);
        }
    }
    (available.len(), Scan::Partial)
}
