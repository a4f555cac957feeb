//! Configuration settings for the authentication daemon.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::credential::{KdfParams, DEFAULT_DIGEST_LEN, DEFAULT_ITERATIONS, DEFAULT_SALT_LEN};
use crate::error::ServiceError;

/// Lowest accepted PBKDF2 iteration count.
pub const MIN_ITERATIONS: u32 = 1_000;

/// Shortest accepted salt in bytes.
pub const MIN_SALT_LENGTH: usize = 16;

/// Accepted digest lengths in bytes.
pub const DIGEST_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 16..=64;

/// Main configuration structure for the daemon.
///
/// Loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub socket: SocketConfig,
    #[serde(default)]
    pub credentials: CredentialConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Socket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketConfig {
    /// Path to the Unix socket file.
    pub path: PathBuf,
    /// Socket file permissions (e.g., "0660").
    #[serde(default = "default_socket_permissions")]
    pub permissions: String,
}

/// Password hashing parameters.
///
/// Changing any of these invalidates every stored credential record.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
    /// PBKDF2 iteration count.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Salt width in bytes.
    #[serde(default = "default_salt_length")]
    pub salt_length: usize,
    /// Digest width in bytes.
    #[serde(default = "default_digest_length")]
    pub digest_length: usize,
}

/// Session store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime after login, in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: u64,
    /// Interval between expired-session sweeps, in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Failed logins allowed per account per window.
    #[serde(default = "default_login_max_attempts")]
    pub login_max_attempts: usize,
    /// Login throttle window in seconds.
    #[serde(default = "default_login_window")]
    pub login_window_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Limits configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum concurrent connections.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    /// Socket read/write timeout in seconds.
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_seconds: u64,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Path to the audit log file.
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

// Default value functions
fn default_socket_permissions() -> String {
    "0660".to_string()
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_salt_length() -> usize {
    DEFAULT_SALT_LEN
}

fn default_digest_length() -> usize {
    DEFAULT_DIGEST_LEN
}

fn default_session_ttl() -> u64 {
    86_400 // 24h
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_login_max_attempts() -> usize {
    5
}

fn default_login_window() -> u64 {
    900
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_message_size() -> usize {
    65_536
}

fn default_max_concurrent() -> usize {
    100
}

fn default_socket_timeout() -> u64 {
    30
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("/var/log/storefront/authd-audit.log")
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            salt_length: default_salt_length(),
            digest_length: default_digest_length(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_session_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            login_max_attempts: default_login_max_attempts(),
            login_window_seconds: default_login_window(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            max_concurrent_requests: default_max_concurrent(),
            socket_timeout_seconds: default_socket_timeout(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            log_path: default_audit_log_path(),
        }
    }
}

fn config_error(message: String) -> ServiceError {
    ServiceError::Config { message }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            config_error(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ServiceError::Config { message } => {
                config_error(format!("{} ({})", message, path.display()))
            }
            other => other,
        })
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ServiceError> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| config_error(format!("Failed to parse config: {}", e)))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Key-derivation parameters for the password hasher.
    pub fn kdf_params(&self) -> Result<KdfParams, ServiceError> {
        KdfParams::new(
            self.credentials.iterations,
            self.credentials.salt_length,
            self.credentials.digest_length,
        )
        .ok_or_else(|| config_error("credentials.iterations must be non-zero".to_string()))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.sessions.ttl_seconds)
    }

    pub fn session_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.sessions.cleanup_interval_seconds)
    }

    pub fn login_window(&self) -> Duration {
        Duration::from_secs(self.security.login_window_seconds)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.socket_timeout_seconds)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), ServiceError> {
        if self.socket.path.as_os_str().is_empty() {
            return Err(config_error("socket.path cannot be empty".to_string()));
        }

        // Validate socket permissions format
        if self.socket.permissions.is_empty()
            || !self.socket.permissions.chars().all(|c| ('0'..='7').contains(&c))
        {
            return Err(config_error(format!(
                "Invalid socket permissions '{}'. Must be octal (e.g., '0660')",
                self.socket.permissions
            )));
        }

        let creds = &self.credentials;
        if creds.iterations < MIN_ITERATIONS {
            return Err(config_error(format!(
                "credentials.iterations must be at least {}, got {}",
                MIN_ITERATIONS, creds.iterations
            )));
        }
        if creds.salt_length < MIN_SALT_LENGTH {
            return Err(config_error(format!(
                "credentials.salt_length must be at least {} bytes, got {}",
                MIN_SALT_LENGTH, creds.salt_length
            )));
        }
        if !DIGEST_LENGTH_RANGE.contains(&creds.digest_length) {
            return Err(config_error(format!(
                "credentials.digest_length must be within {:?} bytes, got {}",
                DIGEST_LENGTH_RANGE, creds.digest_length
            )));
        }

        if self.sessions.ttl_seconds == 0 {
            return Err(config_error(
                "sessions.ttl_seconds must be greater than 0".to_string(),
            ));
        }
        if self.sessions.cleanup_interval_seconds == 0 {
            return Err(config_error(
                "sessions.cleanup_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.security.login_max_attempts == 0 || self.security.login_window_seconds == 0 {
            return Err(config_error(
                "security.login_max_attempts and login_window_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        if self.limits.max_message_size == 0 || self.limits.max_concurrent_requests == 0 {
            return Err(config_error(
                "limits.max_message_size and max_concurrent_requests must be greater than 0"
                    .to_string(),
            ));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(config_error(format!(
                "Invalid log level '{}'. Valid levels: {:?}",
                self.logging.level, valid_levels
            )));
        }

        // Validate log format
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(config_error(format!(
                "Invalid log format '{}'. Valid formats: {:?}",
                self.logging.format, valid_formats
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [socket]
        path = "/run/storefront/authd.sock"
    "#;

    fn assert_config_error(content: &str, needle: &str) {
        match Settings::from_toml_str(content) {
            Err(ServiceError::Config { message }) => {
                assert!(message.contains(needle), "unexpected message: {}", message)
            }
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_socket_permissions(), "0660");
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_log_format(), "pretty");
        assert_eq!(default_iterations(), 600_000);
    }

    #[test]
    fn test_minimal_config() {
        let settings = Settings::from_toml_str(MINIMAL).unwrap();
        assert_eq!(
            settings.socket.path,
            PathBuf::from("/run/storefront/authd.sock")
        );
        assert_eq!(settings.credentials.salt_length, 16);
        assert_eq!(settings.session_ttl(), Duration::from_secs(86_400));
        assert_eq!(settings.security.login_max_attempts, 5);
        assert!(settings.audit.enabled);

        let params = settings.kdf_params().unwrap();
        assert_eq!(params.iterations.get(), 600_000);
        assert_eq!(params.digest_len, 32);
    }

    #[test]
    fn test_missing_socket_path_rejected() {
        assert_config_error("[credentials]\niterations = 5000\n", "Failed to parse");
    }

    #[test]
    fn test_weak_kdf_rejected() {
        assert_config_error(
            &format!("{}\n[credentials]\niterations = 10\n", MINIMAL),
            "iterations",
        );
        assert_config_error(
            &format!("{}\n[credentials]\nsalt_length = 8\n", MINIMAL),
            "salt_length",
        );
        assert_config_error(
            &format!("{}\n[credentials]\ndigest_length = 128\n", MINIMAL),
            "digest_length",
        );
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert_config_error(
            &format!("{}\n[sessions]\nttl_seconds = 0\n", MINIMAL),
            "ttl_seconds",
        );
    }

    #[test]
    fn test_bad_logging_rejected() {
        assert_config_error(
            &format!("{}\n[logging]\nlevel = \"loud\"\n", MINIMAL),
            "log level",
        );
        assert_config_error(
            &format!("{}\n[logging]\nformat = \"xml\"\n", MINIMAL),
            "log format",
        );
    }

    #[test]
    fn test_bad_permissions_rejected() {
        let content = r#"
            [socket]
            path = "/run/authd.sock"
            permissions = "0698"
        "#;
        assert_config_error(content, "socket permissions");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}\n[credentials]\niterations = 2000\n[logging]\nformat = \"json\"\n",
            MINIMAL
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.credentials.iterations, 2000);
        assert_eq!(settings.logging.format, "json");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Settings::load("/nonexistent/authd.toml");
        assert!(matches!(result, Err(ServiceError::Config { .. })));
    }
}
