//! Identifier validation.
//!
//! # Responsibilities
//! - Gate client-supplied asset names before any upstream I/O
//! - Enforce the character allow-list `[A-Za-z0-9-_/.]` and a length bound
//! - Reject directory traversal (`..` anywhere) and segments that would
//!   escape or blur the upstream namespace (`//`, leading/trailing `/`, `.`)
//!
//! # Design Decisions
//! - Pure function, no normalization: an accepted identifier is the input
//! - `Identifier` can only be built through validation

use std::fmt;

use thiserror::Error;

/// Default upper bound on identifier length.
pub const DEFAULT_MAX_ID_LENGTH: usize = 100;

/// Why a raw identifier was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier is {len} bytes long (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("identifier contains disallowed character {0:?}")]
    InvalidCharacter(char),

    #[error("identifier contains '..'")]
    Traversal,

    #[error("identifier contains an empty or '.' path segment")]
    BadSegment,
}

/// A validated, immutable asset identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validate `raw` with the default length bound.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        validate(raw, DEFAULT_MAX_ID_LENGTH)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier already addresses a nested path.
    pub fn has_separator(&self) -> bool {
        self.0.contains('/')
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a raw path segment, returning it unchanged on success.
pub fn validate(raw: &str, max_len: usize) -> Result<Identifier, IdentifierError> {
    if raw.is_empty() {
        return Err(IdentifierError::Empty);
    }
    // Every allowed character is one byte, so bytes and characters agree
    // for any identifier that can pass.
    if raw.len() > max_len {
        return Err(IdentifierError::TooLong {
            len: raw.len(),
            max: max_len,
        });
    }
    if let Some(bad) = raw.chars().find(|&c| !is_allowed(c)) {
        return Err(IdentifierError::InvalidCharacter(bad));
    }
    if raw.contains("..") {
        return Err(IdentifierError::Traversal);
    }
    if raw.split('/').any(|segment| segment.is_empty() || segment == ".") {
        return Err(IdentifierError::BadSegment);
    }
    Ok(Identifier(raw.to_string()))
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.')
}
