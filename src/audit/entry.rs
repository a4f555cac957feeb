//! Audit entry types.

use serde::Serialize;
use uuid::Uuid;

/// A single audit log line.
///
/// `params` and any result data must already be sanitized.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub request_id: Uuid,
    pub command: String,
    pub params: serde_json::Value,
    /// Authenticated user the request ran as, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub result: AuditResult,
    pub duration_ms: u64,
}

impl AuditEntry {
    /// Start an entry with a placeholder success result.
    pub fn new(
        timestamp: String,
        request_id: Uuid,
        command: impl Into<String>,
        params: serde_json::Value,
        user_id: Option<String>,
    ) -> Self {
        Self {
            timestamp,
            request_id,
            command: command.into(),
            params,
            user_id,
            result: AuditResult::Success { data: None },
            duration_ms: 0,
        }
    }

    pub fn succeeded(mut self, data: Option<serde_json::Value>, duration_ms: u64) -> Self {
        self.result = AuditResult::Success { data };
        self.duration_ms = duration_ms;
        self
    }

    pub fn failed(
        mut self,
        error_code: impl Into<String>,
        error_message: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        self.result = AuditResult::Failure {
            error_code: error_code.into(),
            error_message: error_message.into(),
        };
        self.duration_ms = duration_ms;
        self
    }
}

/// Outcome recorded for a request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum AuditResult {
    #[serde(rename = "success")]
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    #[serde(rename = "failure")]
    Failure {
        error_code: String,
        error_message: String,
    },
}
