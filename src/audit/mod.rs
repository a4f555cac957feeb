//! Audit logging module.
//!
//! Every audited request is written as one JSON line with its command,
//! sanitized params, the user it ran as, and its outcome. Passwords, records
//! and session tokens never reach the file.

mod entry;
mod logger;
mod sanitize;

pub use entry::{AuditEntry, AuditResult};
pub use logger::AuditLogger;
pub use sanitize::sanitize_params;
