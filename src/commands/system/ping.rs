//! Ping command for health checking.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ServiceError;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};

/// Returns a pong response; used by the storefront's readiness probe.
pub struct PingCommand;

impl Command for PingCommand {
    fn name(&self) -> &'static str {
        "system.ping"
    }

    fn validate(&self, _params: &CommandParams) -> Result<(), ServiceError> {
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        _params: CommandParams,
    ) -> Result<CommandResult, ServiceError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Ok(CommandResult::success(serde_json::json!({
            "pong": true,
            "timestamp": timestamp,
            "request_id": ctx.request_id().to_string(),
        })))
    }

    fn requires_audit(&self) -> bool {
        false
    }
}
