//! Session store seam and the in-memory implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ring::rand::{SecureRandom, SystemRandom};
use tracing::debug;

use crate::error::{ServiceError, SessionErrorKind};

use super::SessionState;

/// Number of random bytes in a session token.
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Opaque bearer token identifying a session.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh random token.
    pub fn generate(rng: &dyn SecureRandom) -> Result<Self, ServiceError> {
        let mut bytes = [0u8; SESSION_TOKEN_BYTES];
        rng.fill(&mut bytes).map_err(|_| ServiceError::Session {
            kind: SessionErrorKind::TokenGeneration,
        })?;
        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Storage for session state keyed by token.
///
/// Expiry policy belongs to the implementation. Callers only see sessions that
/// are still live.
pub trait SessionStore: Send + Sync {
    /// Look up the session for a token. Unknown or expired tokens yield `None`.
    fn load(&self, token: &str) -> Option<SessionState>;

    /// Start an authenticated session for `user_id`.
    fn create(&self, user_id: &str) -> Result<SessionToken, ServiceError>;

    /// End a session. Returns `true` if a live session was removed.
    fn destroy(&self, token: &str) -> bool;

    /// Number of live sessions (for monitoring).
    fn active_sessions(&self) -> usize;
}

struct SessionEntry {
    state: SessionState,
    expires_at: Instant,
}

/// Thread-safe in-process session store with fixed TTL expiry.
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
    rng: SystemRandom,
}

impl MemorySessionStore {
    /// Create a store whose sessions live for `ttl` after login.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            rng: SystemRandom::new(),
        }
    }

    /// Drop every expired session.
    pub fn cleanup(&self) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, remaining = sessions.len(), "Expired sessions removed");
        }
    }

    /// Start a background cleanup task.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            loop {
                interval_timer.tick().await;
                store.cleanup();
            }
        });
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, token: &str) -> Option<SessionState> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        match sessions.get(token) {
            Some(entry) if entry.expires_at > now => Some(entry.state.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    fn create(&self, user_id: &str) -> Result<SessionToken, ServiceError> {
        let token = SessionToken::generate(&self.rng)?;
        let entry = SessionEntry {
            state: SessionState::for_user(user_id),
            expires_at: Instant::now() + self.ttl,
        };

        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(token.as_str().to_string(), entry);
        Ok(token)
    }

    fn destroy(&self, token: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.remove(token) {
            Some(entry) => entry.expires_at > Instant::now(),
            None => false,
        }
    }

    fn active_sessions(&self) -> usize {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        sessions.values().filter(|e| e.expires_at > now).count()
    }
}
