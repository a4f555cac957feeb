//! Metrics command for monitoring daemon health.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ServiceError;
use crate::session::{LoginThrottle, SessionStore};
use crate::socket::ConnectionMetrics;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns daemon health statistics.
///
/// - uptime_seconds
/// - requests_total / requests_failed
/// - active_connections
/// - active_sessions
/// - throttled_accounts: accounts with recent failed logins
/// - version
pub struct MetricsCommand {
    start_time: Instant,
    metrics: Arc<ConnectionMetrics>,
    sessions: Arc<dyn SessionStore>,
    throttle: Arc<LoginThrottle>,
}

impl MetricsCommand {
    pub fn new(
        metrics: Arc<ConnectionMetrics>,
        sessions: Arc<dyn SessionStore>,
        throttle: Arc<LoginThrottle>,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            metrics,
            sessions,
            throttle,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Command for MetricsCommand {
    fn name(&self) -> &'static str {
        "system.metrics"
    }

    fn validate(&self, _params: &CommandParams) -> Result<(), ServiceError> {
        Ok(())
    }

    fn execute(
        &self,
        _ctx: &ExecutionContext,
        _params: CommandParams,
    ) -> Result<CommandResult, ServiceError> {
        Ok(CommandResult::success(serde_json::json!({
            "uptime_seconds": self.uptime().as_secs(),
            "requests_total": self.metrics.total_requests(),
            "requests_failed": self.metrics.failed_requests(),
            "active_connections": self.metrics.active(),
            "active_sessions": self.sessions.active_sessions(),
            "throttled_accounts": self.throttle.tracked_accounts(),
            "version": VERSION,
        })))
    }

    fn requires_audit(&self) -> bool {
        false
    }
}
