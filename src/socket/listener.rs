//! Unix socket listener.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UnixListener;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, info, warn};

use crate::audit::AuditLogger;
use crate::commands::CommandRegistry;
use crate::config::Settings;
use crate::credential::PasswordHasher;
use crate::error::ServiceError;
use crate::session::{LoginThrottle, SessionStore};

use super::connection::{handle_connection, ConnectionState};

const THROTTLE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Connection metrics for monitoring.
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    /// Total requests processed.
    pub requests_total: AtomicU64,
    /// Total failed requests.
    pub requests_failed: AtomicU64,
    /// Currently active connections.
    pub active_connections: AtomicUsize,
}

impl ConnectionMetrics {
    /// Create new connection metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment request count.
    pub fn record_request(&self, success: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get total request count.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get failed request count.
    pub fn failed_requests(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    /// Get active connection count.
    pub fn active(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }
}

/// Unix socket server.
pub struct SocketListener {
    listener: UnixListener,
    state: ConnectionState,
    /// Semaphore for connection limiting
    connection_semaphore: Arc<Semaphore>,
}

impl SocketListener {
    /// Create and bind a new socket listener.
    ///
    /// Builds the hasher, login throttle and command registry from `settings`.
    /// The session store is owned by the caller so its cleanup task can be
    /// started independently.
    pub async fn bind(
        settings: Arc<Settings>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, ServiceError> {
        let socket_path = &settings.socket.path;

        // Refuse to follow a symlink when clearing a stale socket
        if let Ok(metadata) = std::fs::symlink_metadata(socket_path) {
            if metadata.file_type().is_symlink() {
                return Err(ServiceError::Socket {
                    message: format!(
                        "Socket path {} is a symlink, refusing to remove",
                        socket_path.display()
                    ),
                });
            }

            std::fs::remove_file(socket_path).map_err(|e| ServiceError::Socket {
                message: format!(
                    "Failed to remove existing socket file {}: {}",
                    socket_path.display(),
                    e
                ),
            })?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ServiceError::Socket {
                message: format!(
                    "Failed to create socket directory {}: {}",
                    parent.display(),
                    e
                ),
            })?;
        }

        let listener = UnixListener::bind(socket_path).map_err(|e| ServiceError::Socket {
            message: format!("Failed to bind to socket {}: {}", socket_path.display(), e),
        })?;

        // Only the storefront's user may connect
        Self::set_socket_permissions(socket_path, &settings.socket.permissions)?;

        let hasher = Arc::new(PasswordHasher::new(settings.kdf_params()?));
        info!(
            iterations = settings.credentials.iterations,
            salt_length = settings.credentials.salt_length,
            digest_length = settings.credentials.digest_length,
            "Password hasher configured"
        );

        let throttle = Arc::new(LoginThrottle::new(
            settings.security.login_max_attempts,
            settings.login_window(),
        ));
        throttle.start_cleanup_task(THROTTLE_CLEANUP_INTERVAL);
        info!(
            max_attempts = settings.security.login_max_attempts,
            window_seconds = settings.security.login_window_seconds,
            "Login throttling enabled"
        );

        let metrics = Arc::new(ConnectionMetrics::new());

        let connection_semaphore = Arc::new(Semaphore::new(settings.limits.max_concurrent_requests));
        info!(
            max_connections = settings.limits.max_concurrent_requests,
            "Connection limiting enabled"
        );

        let registry = Arc::new(CommandRegistry::new(
            hasher,
            Arc::clone(&sessions),
            throttle,
            Some(Arc::clone(&metrics)),
        ));

        let audit_logger = if settings.audit.enabled {
            match AuditLogger::new(&settings.audit.log_path) {
                Ok(logger) => {
                    info!(
                        path = %settings.audit.log_path.display(),
                        "Audit logging enabled"
                    );
                    Some(Arc::new(logger))
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        path = %settings.audit.log_path.display(),
                        "Failed to create audit logger, audit logging disabled"
                    );
                    None
                }
            }
        } else {
            info!("Audit logging disabled");
            None
        };

        info!(
            path = %socket_path.display(),
            "Socket listener bound"
        );

        Ok(Self {
            listener,
            state: ConnectionState {
                settings,
                registry,
                sessions,
                audit_logger,
                metrics,
            },
            connection_semaphore,
        })
    }

    /// Get connection metrics.
    pub fn metrics(&self) -> Arc<ConnectionMetrics> {
        Arc::clone(&self.state.metrics)
    }

    /// Set socket file permissions.
    fn set_socket_permissions(path: &Path, permissions_str: &str) -> Result<(), ServiceError> {
        let mode = u32::from_str_radix(permissions_str, 8).map_err(|e| ServiceError::Socket {
            message: format!("Invalid socket permissions '{}': {}", permissions_str, e),
        })?;

        let permissions = std::fs::Permissions::from_mode(mode);
        std::fs::set_permissions(path, permissions).map_err(|e| ServiceError::Socket {
            message: format!(
                "Failed to set socket permissions on {}: {}",
                path.display(),
                e
            ),
        })?;

        Ok(())
    }

    /// Run the socket listener, accepting connections.
    ///
    /// The listener will stop accepting new connections when `shutdown` is notified.
    /// Active connections will continue until they complete or are explicitly closed.
    pub async fn run(&self, shutdown: Arc<Notify>) -> Result<(), ServiceError> {
        info!("Socket listener running, waiting for connections...");

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            // Try to acquire a connection permit
                            let permit = match self.connection_semaphore.clone().try_acquire_owned() {
                                Ok(permit) => permit,
                                Err(_) => {
                                    warn!(
                                        max = self.state.settings.limits.max_concurrent_requests,
                                        "Connection limit reached, rejecting connection"
                                    );
                                    // Connection will be dropped, rejecting the client
                                    continue;
                                }
                            };

                            let state = self.state.clone();
                            let metrics = Arc::clone(&self.state.metrics);

                            metrics.active_connections.fetch_add(1, Ordering::Relaxed);
                            debug!(
                                active = metrics.active(),
                                "New connection accepted"
                            );

                            tokio::spawn(async move {
                                let _permit = permit; // Released when the task completes
                                if let Err(e) = handle_connection(stream, state).await {
                                    error!(error = %e, "Connection handler error");
                                }

                                metrics.active_connections.fetch_sub(1, Ordering::Relaxed);
                                debug!(
                                    active = metrics.active(),
                                    "Connection closed"
                                );
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Wait for all active connections to drain.
    ///
    /// Returns immediately if there are no active connections.
    pub async fn wait_for_drain(&self) {
        let poll_interval = Duration::from_millis(100);

        while self.state.metrics.active() > 0 {
            debug!(
                active = self.state.metrics.active(),
                "Waiting for connections to drain"
            );
            tokio::time::sleep(poll_interval).await;
        }

        info!("All connections drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counts_requests() {
        let metrics = ConnectionMetrics::new();
        metrics.record_request(true);
        metrics.record_request(false);
        metrics.record_request(true);

        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.failed_requests(), 1);
        assert_eq!(metrics.active(), 0);
    }

    #[test]
    fn test_invalid_permissions_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("file");
        std::fs::write(&path, b"").unwrap();

        assert!(SocketListener::set_socket_permissions(&path, "not-octal").is_err());
        assert!(SocketListener::set_socket_permissions(&path, "0600").is_ok());
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
