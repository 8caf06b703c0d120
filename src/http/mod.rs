//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, one task per connection)
//!     → head.rs (bounded read of the request head)
//!     → request.rs (GET /<id> HTTP/1.x)
//!     → [relay handler: validate, resolve, fetch]
//!     → response.rs (200 image head or 404)
//!     → Send to client
//! ```

pub mod head;
pub mod request;
pub mod response;
pub mod server;

pub use head::{read_head, HeadError};
pub use request::{RequestError, RequestLine};
pub use response::{image_head, DownstreamStatus, NOT_FOUND};
pub use server::RelayServer;
