//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream fetch attempt:
//!     → timeouts.rs (connect deadline, per read/write deadline)
//!     → On expiry: attempt fails, relay moves to the next candidate
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries of the same candidate; extension fallback is the only
//!   second chance a request gets

pub mod timeouts;

pub use timeouts::{timed_out_io, within, write_within, Deadlines, TimedOut};
