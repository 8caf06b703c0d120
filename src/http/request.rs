//! Downstream request-line parsing.
//!
//! # Responsibilities
//! - Extract method, target and version from the first head line
//! - Accept only `GET <target> HTTP/1.x` with an origin-form target
//! - Hand the raw identifier (target minus leading `/`) to the relay
//!
//! # Design Decisions
//! - Headers after the request line are framed but ignored
//! - Every rejection is reported to the client as the same 404

use thiserror::Error;

/// Why a downstream request could not be served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("malformed request line: {0:?}")]
    Malformed(String),

    #[error("unsupported method {0:?}")]
    UnsupportedMethod(String),

    #[error("request target {0:?} is not an absolute path")]
    BadTarget(String),

    #[error("unsupported protocol version {0:?}")]
    BadVersion(String),
}

/// The parsed first line of a downstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: String,
}

impl RequestLine {
    /// Parse the request line at the start of `head`.
    pub fn parse(head: &[u8]) -> Result<Self, RequestError> {
        let end = head
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(head.len());
        let line = std::str::from_utf8(&head[..end]).map_err(|_| {
            RequestError::Malformed(String::from_utf8_lossy(&head[..end]).into_owned())
        })?;

        let mut parts = line.split(' ');
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(RequestError::Malformed(line.to_string()));
        };
        if method.is_empty() || target.is_empty() || version.is_empty() {
            return Err(RequestError::Malformed(line.to_string()));
        }

        if method != "GET" {
            return Err(RequestError::UnsupportedMethod(method.to_string()));
        }
        if !target.starts_with('/') {
            return Err(RequestError::BadTarget(target.to_string()));
        }
        if version != "HTTP/1.1" && version != "HTTP/1.0" {
            return Err(RequestError::BadVersion(version.to_string()));
        }

        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
        })
    }

    /// Identifier as sent by the client, not yet validated.
    pub fn raw_id(&self) -> &str {
        &self.target[1..]
    }
}
