//! Guarded session queries: `session.authorize` and `session.whoami`.
//!
//! Both only run after the session guard allowed the request, so reaching
//! `execute` already means the session is authenticated.

use crate::error::{ServiceError, SessionErrorKind};

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};

fn authenticated_user(ctx: &ExecutionContext) -> Result<&str, ServiceError> {
    ctx.user_id().ok_or(ServiceError::Session {
        kind: SessionErrorKind::Unauthorized,
    })
}

/// Called by the storefront's auth middleware in front of protected routes.
pub struct AuthorizeCommand;

impl Command for AuthorizeCommand {
    fn name(&self) -> &'static str {
        "session.authorize"
    }

    fn validate(&self, _params: &CommandParams) -> Result<(), ServiceError> {
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        _params: CommandParams,
    ) -> Result<CommandResult, ServiceError> {
        let user_id = authenticated_user(ctx)?;
        Ok(CommandResult::success(serde_json::json!({
            "authorized": true,
            "user_id": user_id,
        })))
    }

    fn requires_session(&self) -> bool {
        true
    }

    fn requires_audit(&self) -> bool {
        // Runs on every protected page load
        false
    }
}

/// Returns the signed-in user id.
pub struct WhoAmICommand;

impl Command for WhoAmICommand {
    fn name(&self) -> &'static str {
        "session.whoami"
    }

    fn validate(&self, _params: &CommandParams) -> Result<(), ServiceError> {
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        _params: CommandParams,
    ) -> Result<CommandResult, ServiceError> {
        let user_id = authenticated_user(ctx)?;
        Ok(CommandResult::success(serde_json::json!({ "user_id": user_id })))
    }

    fn requires_session(&self) -> bool {
        true
    }

    fn requires_audit(&self) -> bool {
        false
    }
}
