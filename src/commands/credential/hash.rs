//! `credential.hash`: produce a storable record for a new or reset password.

use std::sync::Arc;

use tracing::info;

use crate::credential::PasswordHasher;
use crate::error::ServiceError;

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};

/// Hash a plaintext password into a `salt:digest` record.
///
/// Used by account registration and admin password resets. Password policy
/// is the caller's job; any string is hashed.
pub struct HashCredentialCommand {
    hasher: Arc<PasswordHasher>,
}

impl HashCredentialCommand {
    pub fn new(hasher: Arc<PasswordHasher>) -> Self {
        Self { hasher }
    }
}

impl Command for HashCredentialCommand {
    fn name(&self) -> &'static str {
        "credential.hash"
    }

    fn validate(&self, params: &CommandParams) -> Result<(), ServiceError> {
        params.require_string("password")
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandResult, ServiceError> {
        let password = params.get_string("password")?;
        let record = self.hasher.hash(&password)?;

        info!(request_id = %ctx.request_id(), "Credential record issued");

        Ok(CommandResult::success(serde_json::json!({
            "record": record.to_string(),
        })))
    }
}
