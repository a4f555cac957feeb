//! Command types: parameters, results, and execution context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ServiceError, ValidationErrorKind};
use crate::session::RequestContext;

/// Wrapper around command parameters with helper methods.
#[derive(Clone)]
pub struct CommandParams {
    inner: serde_json::Value,
}

impl CommandParams {
    /// Create new command parameters from a JSON value.
    pub fn new(value: serde_json::Value) -> Self {
        Self { inner: value }
    }

    /// Get the underlying JSON value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.inner
    }

    /// Get a required string parameter.
    ///
    /// Empty strings are returned as-is; password policy is not enforced here.
    pub fn get_string(&self, key: &str) -> Result<String, ServiceError> {
        self.inner
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ServiceError::Validation {
                kind: ValidationErrorKind::MissingParameter {
                    param: key.to_string(),
                },
            })
    }

    /// Require that a string parameter exists (for validation).
    pub fn require_string(&self, key: &str) -> Result<(), ServiceError> {
        self.get_string(key).map(|_| ())
    }

    /// Require a string parameter that is present and not blank.
    pub fn require_non_empty(&self, key: &str) -> Result<(), ServiceError> {
        if self.get_string(key)?.trim().is_empty() {
            return Err(ServiceError::Validation {
                kind: ValidationErrorKind::InvalidParameter {
                    param: key.to_string(),
                    message: "must not be empty".to_string(),
                },
            });
        }
        Ok(())
    }
}

impl From<serde_json::Value> for CommandParams {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

// Never print parameter values: they carry passwords.
impl std::fmt::Debug for CommandParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&str> = self
            .inner
            .as_object()
            .map(|obj| obj.keys().map(String::as_str).collect())
            .unwrap_or_default();
        f.debug_struct("CommandParams").field("keys", &keys).finish()
    }
}

/// Result of command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,
    /// Result data on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error code on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CommandResult {
    /// Create a success result with data.
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_code: None,
            error_message: None,
        }
    }

    /// Create a failure result.
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error_code: Some(code.into()),
            error_message: Some(message.into()),
        }
    }
}

/// Execution context for a command.
///
/// Carries the immutable session snapshot resolved for this request.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Request id and session snapshot.
    pub request: RequestContext,
    /// Raw token the session was resolved from, needed by logout and login.
    pub session_token: Option<String>,
    /// Timestamp when the request was received.
    pub timestamp: u64,
    /// The command being executed.
    pub command: String,
}

impl ExecutionContext {
    /// Create a new execution context.
    pub fn new(
        request: RequestContext,
        session_token: Option<String>,
        timestamp: u64,
        command: String,
    ) -> Self {
        Self {
            request,
            session_token,
            timestamp,
            command,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request.request_id()
    }

    /// Authenticated user from the session snapshot.
    pub fn user_id(&self) -> Option<&str> {
        self.request.user_id()
    }
}
