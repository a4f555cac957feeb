//! Unix socket server module.
//!
//! Accepts storefront connections, resolves each request's session and hands
//! it to the command registry.

mod connection;
mod listener;

pub use connection::{handle_connection, ConnectionState};
pub use listener::{ConnectionMetrics, SocketListener};
