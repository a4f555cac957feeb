//! Session state, storage and authorization.
//!
//! Sessions are keyed by an opaque token that the storefront carries in a
//! cookie. The transport layer resolves the token into an immutable
//! [`RequestContext`] once per request, and the [`SessionGuard`] decides from
//! that snapshot alone whether a protected command may run.

mod guard;
mod state;
mod store;
mod throttle;

pub use guard::{Decision, Rejection, SessionGuard};
pub use state::{AuthState, RequestContext, SessionState};
pub use store::{MemorySessionStore, SessionStore, SessionToken, SESSION_TOKEN_BYTES};
pub use throttle::{LoginAttempt, LoginThrottle};
