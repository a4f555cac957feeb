//! Error types for the authentication daemon.

use thiserror::Error;

/// Main error type for the daemon.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Socket-related errors.
    #[error("Socket error: {message}")]
    Socket { message: String },

    /// Credential hashing and parsing errors.
    #[error("Credential error: {kind}")]
    Credential { kind: CredentialErrorKind },

    /// Session store and authorization errors.
    #[error("Session error: {kind}")]
    Session { kind: SessionErrorKind },

    /// Validation errors.
    #[error("Validation error: {kind}")]
    Validation { kind: ValidationErrorKind },

    /// Command execution errors.
    #[error("Command error: {kind}")]
    Command { kind: CommandErrorKind },

    /// Protocol errors.
    #[error("Protocol error: {kind}")]
    Protocol { kind: ProtocolErrorKind },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Credential error kinds.
///
/// Messages never carry the password, the salt or the digest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialErrorKind {
    #[error("Malformed credential record: {reason}")]
    MalformedRecord { reason: &'static str },

    #[error("System random source unavailable")]
    RandomUnavailable,
}

/// Session error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionErrorKind {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Failed to generate session token")]
    TokenGeneration,
}

/// Validation error kinds.
#[derive(Error, Debug)]
pub enum ValidationErrorKind {
    #[error("Missing required parameter: {param}")]
    MissingParameter { param: String },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },
}

/// Command error kinds.
#[derive(Error, Debug)]
pub enum CommandErrorKind {
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },
}

/// Protocol error kinds.
#[derive(Error, Debug)]
pub enum ProtocolErrorKind {
    #[error("Message too large: {size} bytes exceeds maximum of {max} bytes")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection timed out")]
    ConnectionTimeout,
}

impl ServiceError {
    /// Wire error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation { .. } => "VALIDATION_ERROR",
            ServiceError::Command {
                kind: CommandErrorKind::UnknownCommand { .. },
            } => "UNKNOWN_COMMAND",
            ServiceError::Session {
                kind: SessionErrorKind::Unauthorized,
            } => "UNAUTHORIZED",
            _ => "EXECUTION_ERROR",
        }
    }
}

/// Result type alias for daemon operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
