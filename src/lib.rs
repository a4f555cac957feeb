//! Storefront authentication daemon library.
//!
//! Stores passwords as salted PBKDF2 records, opens sessions on login and
//! gates protected storefront routes on an authenticated session. The
//! storefront talks to it over a Unix socket.

pub mod audit;
pub mod commands;
pub mod config;
pub mod credential;
pub mod error;
pub mod protocol;
pub mod session;
pub mod socket;
