//! Upstream failure taxonomy.
//!
//! Every variant of [`FetchError`] means "this candidate did not produce an
//! image"; none of them is fatal to the relay.

use std::io;

use thiserror::Error;

/// Why a single upstream fetch attempt failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] io::Error),

    #[error("connect timed out")]
    ConnectTimeout,

    #[error("request write failed: {0}")]
    WriteFailed(#[source] io::Error),

    #[error("request write timed out")]
    WriteTimeout,

    #[error("timed out waiting for response head")]
    HeaderTimeout,

    #[error("response head exceeds {limit} bytes")]
    HeaderTooLarge { limit: usize },

    #[error("connection closed after {received} bytes of response head")]
    HeaderIncomplete { received: usize },

    #[error("response head read failed: {0}")]
    HeaderReadFailed(#[source] io::Error),

    #[error("malformed response head: {0}")]
    MalformedHeader(String),

    #[error("upstream answered with status {0}")]
    NonSuccessStatus(u16),

    #[error("upstream content type {0:?} is not an image")]
    NotAnImage(Option<String>),

    #[error("unsupported transfer encoding {0:?}")]
    UnsupportedTransferEncoding(String),

    #[error("missing or zero Content-Length")]
    MissingOrZeroLength,

    #[error("declared body of {declared} bytes exceeds limit of {limit}")]
    BodyTooLarge { declared: u64, limit: u64 },

    #[error("body ended after {received} of {expected} bytes")]
    ShortBody { expected: u64, received: u64 },

    #[error("timed out reading body after {received} bytes")]
    BodyTimeout { received: u64 },

    #[error("body read failed after {received} bytes: {source}")]
    BodyReadFailed {
        received: u64,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// Whether the attempt was cut short by a deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout
                | Self::WriteTimeout
                | Self::HeaderTimeout
                | Self::BodyTimeout { .. }
        )
    }

    /// Whether the upstream answered, but not with a relayable image.
    pub fn is_content_rejection(&self) -> bool {
        matches!(
            self,
            Self::NonSuccessStatus(_)
                | Self::NotAnImage(_)
                | Self::UnsupportedTransferEncoding(_)
                | Self::MissingOrZeroLength
                | Self::BodyTooLarge { .. }
        )
    }

    /// Stable label for metrics and structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ConnectFailed(_) => "connect_failed",
            Self::ConnectTimeout => "connect_timeout",
            Self::WriteFailed(_) => "write_failed",
            Self::WriteTimeout => "write_timeout",
            Self::HeaderTimeout => "header_timeout",
            Self::HeaderTooLarge { .. } => "header_too_large",
            Self::HeaderIncomplete { .. } => "header_incomplete",
            Self::HeaderReadFailed(_) => "header_read_failed",
            Self::MalformedHeader(_) => "malformed_header",
            Self::NonSuccessStatus(_) => "non_success_status",
            Self::NotAnImage(_) => "not_an_image",
            Self::UnsupportedTransferEncoding(_) => "unsupported_transfer_encoding",
            Self::MissingOrZeroLength => "missing_or_zero_length",
            Self::BodyTooLarge { .. } => "body_too_large",
            Self::ShortBody { .. } => "short_body",
            Self::BodyTimeout { .. } => "body_timeout",
            Self::BodyReadFailed { .. } => "body_read_failed",
        }
    }
}

/// Failure while streaming a body from upstream into a sink.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The upstream side broke off; the sink received a truncated body.
    #[error("upstream: {0}")]
    Upstream(#[from] FetchError),

    /// The sink (usually the downstream client) stopped accepting bytes.
    #[error("sink write failed after {written} bytes: {source}")]
    Sink {
        written: u64,
        #[source]
        source: io::Error,
    },
}

impl BodyError {
    /// Bytes delivered to the sink before the failure.
    pub fn delivered(&self) -> u64 {
        match self {
            Self::Upstream(
                FetchError::ShortBody { received, .. }
                | FetchError::BodyTimeout { received }
                | FetchError::BodyReadFailed { received, .. },
            ) => *received,
            Self::Upstream(_) => 0,
            Self::Sink { written, .. } => *written,
        }
    }
}
