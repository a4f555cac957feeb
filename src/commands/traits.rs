//! Command trait definition.

use crate::error::ServiceError;

use super::types::{CommandParams, CommandResult, ExecutionContext};

/// Core trait for all executable commands.
///
/// # Example
///
/// ```ignore
/// pub struct WhoAmICommand;
///
/// impl Command for WhoAmICommand {
///     fn name(&self) -> &'static str {
///         "session.whoami"
///     }
///
///     fn validate(&self, _params: &CommandParams) -> Result<(), ServiceError> {
///         Ok(())
///     }
///
///     fn execute(
///         &self,
///         ctx: &ExecutionContext,
///         _params: CommandParams,
///     ) -> Result<CommandResult, ServiceError> {
///         Ok(CommandResult::success(serde_json::json!({"user_id": ctx.user_id()})))
///     }
///
///     fn requires_session(&self) -> bool {
///         true
///     }
/// }
/// ```
pub trait Command: Send + Sync {
    /// Unique command identifier (e.g., "session.login").
    fn name(&self) -> &'static str;

    /// Validate the command parameters before execution.
    fn validate(&self, params: &CommandParams) -> Result<(), ServiceError>;

    /// Execute the command.
    ///
    /// Called on the blocking pool: hashing and verification run here.
    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandResult, ServiceError>;

    /// Whether the session guard must allow the request first.
    fn requires_session(&self) -> bool {
        false
    }

    /// Whether this command requires audit logging.
    ///
    /// Disabled for high-frequency checks that would flood the log.
    fn requires_audit(&self) -> bool {
        true
    }
}
