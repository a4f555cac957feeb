//! `session.logout`: destroy the session the request carries.

use std::sync::Arc;

use tracing::info;

use crate::error::ServiceError;
use crate::session::SessionStore;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};

/// Log out. Idempotent: a missing or stale token still succeeds.
pub struct LogoutCommand {
    sessions: Arc<dyn SessionStore>,
}

impl LogoutCommand {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }
}

impl Command for LogoutCommand {
    fn name(&self) -> &'static str {
        "session.logout"
    }

    fn validate(&self, _params: &CommandParams) -> Result<(), ServiceError> {
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        _params: CommandParams,
    ) -> Result<CommandResult, ServiceError> {
        let logged_out = ctx
            .session_token
            .as_deref()
            .map(|token| self.sessions.destroy(token))
            .unwrap_or(false);

        if logged_out {
            info!(
                request_id = %ctx.request_id(),
                user_id = ctx.user_id().unwrap_or_default(),
                "Session destroyed"
            );
        }

        Ok(CommandResult::success(serde_json::json!({
            "logged_out": logged_out,
        })))
    }
}
