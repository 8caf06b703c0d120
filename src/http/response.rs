//! Downstream response assembly.
//!
//! # Responsibilities
//! - Build the `200 OK` head for a relayed image
//! - Provide the single, body-less `404 Not Found` used for every failure
//!
//! # Design Decisions
//! - Every response carries `Connection: close`
//! - `Content-Type` is mirrored from upstream, never reinterpreted
//! - Failure causes are not distinguishable from outside

/// The response sent for every failed request.
pub const NOT_FOUND: &[u8] =
    b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Outcome reported to the downstream client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownstreamStatus {
    Ok,
    NotFound,
}

impl DownstreamStatus {
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NotFound => 404,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "200",
            Self::NotFound => "404",
        }
    }
}

/// Head of a successful image response.
pub fn image_head(content_type: &str, content_length: u64, cache_max_age_secs: u64) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {content_length}\r\n\
         Cache-Control: public, max-age={cache_max_age_secs}\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Connection: close\r\n\
         \r\n"
    )
    .into_bytes()
}
