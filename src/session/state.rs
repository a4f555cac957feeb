//! Session state and the per-request context snapshot.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authentication state derived from a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

/// Session state as held by the session store.
///
/// A non-empty `user_id` means the session is authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl SessionState {
    /// An anonymous session.
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// A session authenticated as `user_id`.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// The authenticated user, if any. Empty identifiers count as absent.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id().is_some()
    }

    pub fn auth_state(&self) -> AuthState {
        if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }
}

/// Immutable per-request snapshot handed to the session guard.
///
/// The transport layer resolves the session once when the request arrives;
/// nothing downstream mutates it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    session: Option<SessionState>,
}

impl RequestContext {
    pub fn new(request_id: Uuid, session: Option<SessionState>) -> Self {
        Self {
            request_id,
            session,
        }
    }

    /// A context with no session attached.
    pub fn anonymous(request_id: Uuid) -> Self {
        Self::new(request_id, None)
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    /// Shortcut for the session's authenticated user.
    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().and_then(SessionState::user_id)
    }
}
