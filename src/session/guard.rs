//! Session guard: allow or reject a request based on its session snapshot.

use tracing::debug;

use super::RequestContext;

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unauthorized,
}

impl Rejection {
    /// Machine-readable signal for the transport layer.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::Unauthorized => "UNAUTHORIZED",
        }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reject(Rejection),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Gate in front of protected commands.
///
/// Reads the session snapshot and branches; it never errors and never touches
/// the session store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionGuard;

impl SessionGuard {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether the request may proceed.
    pub fn authorize(&self, ctx: &RequestContext) -> Decision {
        match ctx.user_id() {
            Some(_) => Decision::Allow,
            None => {
                debug!(
                    request_id = %ctx.request_id(),
                    has_session = ctx.session().is_some(),
                    "Session guard rejected request"
                );
                Decision::Reject(Rejection::Unauthorized)
            }
        }
    }
}
