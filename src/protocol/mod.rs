//! Wire protocol module.
//!
//! Defines request/response types and message framing for socket communication.
//!
//! ## Wire Format
//!
//! Messages are length-prefixed JSON:
//! ```text
//! [4 bytes: length (big-endian u32)][JSON payload]
//! ```
//!
//! A request names a command, its parameters, and optionally the session
//! token the storefront read from the client's cookie:
//! ```text
//! {"command": "session.whoami", "params": {}, "session_token": "9f2c..."}
//! ```

mod request;
mod response;
mod wire;

pub use request::Request;
pub use response::{ErrorResponse, Response};
pub use wire::{
    read_message, read_message_with_timeout, write_message, write_message_with_timeout,
    DEFAULT_MAX_MESSAGE_SIZE,
};
