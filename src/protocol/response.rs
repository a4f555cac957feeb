//! Response types for the daemon protocol.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Generic client-facing text for each error code.
///
/// Detailed messages stay in the server log; clients only learn the category,
/// so a rejection never reveals whether an account exists.
fn client_message(code: &str) -> &'static str {
    match code {
        "UNAUTHORIZED" => "Unauthorized",
        "INVALID_CREDENTIALS" => "Invalid credentials",
        "LOGIN_THROTTLED" => "Too many login attempts",
        "VALIDATION_ERROR" => "Invalid request parameters",
        "UNKNOWN_COMMAND" => "Unknown command",
        "EXECUTION_ERROR" => "Internal execution error",
        "INTERNAL_ERROR" => "Internal server error",
        "PROTOCOL_ERROR" => "Malformed request",
        _ => "An error occurred",
    }
}

/// A response from the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Whether the request succeeded.
    pub success: bool,

    /// Unique identifier for this request/response pair.
    pub request_id: Uuid,

    /// Response data on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error details on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

/// Error details in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "UNAUTHORIZED", "INVALID_CREDENTIALS").
    pub code: String,

    /// Generic human-readable message.
    pub message: String,
}

impl Response {
    /// Create a success response.
    pub fn success(request_id: Uuid, data: serde_json::Value) -> Self {
        Self {
            success: true,
            request_id,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    ///
    /// `detail` is logged server-side and replaced with generic text for the
    /// client.
    pub fn error(request_id: Uuid, code: impl Into<String>, detail: impl AsRef<str>) -> Self {
        let code = code.into();

        debug!(
            request_id = %request_id,
            code = %code,
            detail = %detail.as_ref(),
            "Error response (sanitized for client)"
        );

        let message = client_message(&code).to_string();
        Self {
            success: false,
            request_id,
            data: None,
            error: Some(ErrorResponse { code, message }),
        }
    }

    /// Error code, if this is an error response.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}
