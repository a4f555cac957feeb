//! `credential.verify`: check a password against a stored record.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::credential::PasswordHasher;
use crate::error::{ServiceError, ValidationErrorKind};
use crate::session::LoginThrottle;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};

/// Verify a password against a `salt:digest` record.
///
/// Malformed records verify as `false`; they are not an error. When the
/// optional `user_id` names the record's owner the check counts against that
/// account's login throttle. Without it the only limit is who may open the
/// socket.
pub struct VerifyCredentialCommand {
    hasher: Arc<PasswordHasher>,
    throttle: Arc<LoginThrottle>,
}

impl VerifyCredentialCommand {
    pub fn new(hasher: Arc<PasswordHasher>, throttle: Arc<LoginThrottle>) -> Self {
        Self { hasher, throttle }
    }
}

fn optional_user_id(params: &CommandParams) -> Result<Option<String>, ServiceError> {
    match params.as_value().get("user_id") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.clone())),
        Some(_) => Err(ServiceError::Validation {
            kind: ValidationErrorKind::InvalidParameter {
                param: "user_id".to_string(),
                message: "must be a non-empty string".to_string(),
            },
        }),
    }
}

impl Command for VerifyCredentialCommand {
    fn name(&self) -> &'static str {
        "credential.verify"
    }

    fn validate(&self, params: &CommandParams) -> Result<(), ServiceError> {
        params.require_string("password")?;
        params.require_string("record")?;
        optional_user_id(params)?;
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandResult, ServiceError> {
        let password = params.get_string("password")?;
        let record = params.get_string("record")?;

        let valid = match optional_user_id(&params)? {
            Some(user_id) => {
                let Some(attempt) = self.throttle.try_acquire(&user_id) else {
                    warn!(request_id = %ctx.request_id(), user_id = %user_id, "Verify throttled");
                    return Ok(CommandResult::failure(
                        "LOGIN_THROTTLED",
                        "Too many failed password attempts",
                    ));
                };
                let valid = self.hasher.verify(&password, &record);
                if valid {
                    attempt.succeeded();
                } else {
                    attempt.failed();
                }
                valid
            }
            None => self.hasher.verify(&password, &record),
        };
        debug!(request_id = %ctx.request_id(), valid, "Credential verified");

        Ok(CommandResult::success(serde_json::json!({ "valid": valid })))
    }
}
