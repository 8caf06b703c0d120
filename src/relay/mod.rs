//! Fetch-and-relay pipeline.
//!
//! # Data Flow
//! ```text
//! raw request path
//!     → identifier.rs (allow-list, length, traversal gate)
//!     → resolver.rs (ordered candidate paths)
//!     → handler.rs (per candidate: upstream fetch, first success wins)
//!     → 200 + streamed body, or 404
//! ```

pub mod handler;
pub mod identifier;
pub mod resolver;

pub use handler::{NotFoundReason, RelayHandler, RelayOutcome};
pub use identifier::{validate, Identifier, IdentifierError};
pub use resolver::{CandidatePath, Candidates, ExtensionResolver};
