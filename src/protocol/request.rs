//! Request types for the daemon protocol.

use serde::{Deserialize, Serialize};

/// A request from the storefront backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct Request {
    /// The command to execute (e.g., "credential.verify", "session.login").
    pub command: String,

    /// Command parameters as a JSON object.
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,

    /// Session token from the client's cookie, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

fn empty_params() -> serde_json::Value {
    serde_json::json!({})
}

impl Request {
    /// Create a request with no parameters and no session.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: empty_params(),
            session_token: None,
        }
    }

    /// Add a parameter (builder pattern).
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        if let Some(obj) = self.params.as_object_mut() {
            obj.insert(key.to_string(), value.into());
        }
        self
    }

    /// Attach a session token (builder pattern).
    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

// Params carry passwords and the token is a bearer secret.
impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("command", &self.command)
            .field("has_session_token", &self.session_token.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialization_defaults() {
        let request: Request = serde_json::from_str(r#"{"command":"system.ping"}"#).unwrap();
        assert_eq!(request.command, "system.ping");
        assert!(request.params.as_object().unwrap().is_empty());
        assert!(request.session_token.is_none());
    }

    #[test]
    fn test_request_with_session() {
        let json = r#"{"command":"session.whoami","params":{},"session_token":"abc"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(request.session_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_builder() {
        let request = Request::new("credential.hash")
            .with_param("password", "Admin123!@#")
            .with_session("tok");
        assert_eq!(request.params["password"], "Admin123!@#");
        assert_eq!(request.session_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let request = Request::new("credential.hash")
            .with_param("password", "Admin123!@#")
            .with_session("tok-secret");
        let debug = format!("{:?}", request);
        assert!(debug.contains("credential.hash"));
        assert!(!debug.contains("Admin123"));
        assert!(!debug.contains("tok-secret"));
    }
}
