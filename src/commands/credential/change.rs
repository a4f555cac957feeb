//! `credential.change`: replace the signed-in user's password.

use std::sync::Arc;

use tracing::{info, warn};

use crate::credential::PasswordHasher;
use crate::error::{ServiceError, SessionErrorKind};
use crate::session::LoginThrottle;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};

/// Verify the current password, then issue a record for the new one.
///
/// The storefront persists the returned record; the old one stays valid until
/// it does.
pub struct ChangeCredentialCommand {
    hasher: Arc<PasswordHasher>,
    throttle: Arc<LoginThrottle>,
}

impl ChangeCredentialCommand {
    pub fn new(hasher: Arc<PasswordHasher>, throttle: Arc<LoginThrottle>) -> Self {
        Self { hasher, throttle }
    }
}

impl Command for ChangeCredentialCommand {
    fn name(&self) -> &'static str {
        "credential.change"
    }

    fn validate(&self, params: &CommandParams) -> Result<(), ServiceError> {
        params.require_string("current_password")?;
        params.require_string("record")?;
        params.require_string("new_password")?;
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandResult, ServiceError> {
        let user_id = ctx.user_id().ok_or(ServiceError::Session {
            kind: SessionErrorKind::Unauthorized,
        })?;

        let current = params.get_string("current_password")?;
        let record = params.get_string("record")?;
        let new_password = params.get_string("new_password")?;

        let Some(attempt) = self.throttle.try_acquire(user_id) else {
            warn!(request_id = %ctx.request_id(), user_id, "Password change throttled");
            return Ok(CommandResult::failure(
                "LOGIN_THROTTLED",
                "Too many failed password attempts",
            ));
        };

        if !self.hasher.verify(&current, &record) {
            attempt.failed();
            warn!(request_id = %ctx.request_id(), user_id, "Password change rejected");
            return Ok(CommandResult::failure(
                "INVALID_CREDENTIALS",
                "Current password did not match",
            ));
        }

        let new_record = self.hasher.hash(&new_password)?;
        attempt.succeeded();

        info!(request_id = %ctx.request_id(), user_id, "Password changed");

        Ok(CommandResult::success(serde_json::json!({
            "record": new_record.to_string(),
        })))
    }

    fn requires_session(&self) -> bool {
        true
    }
}
