//! Command registry for dispatching requests to handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::credential::PasswordHasher;
use crate::error::{CommandErrorKind, ServiceError, SessionErrorKind};
use crate::session::{Decision, LoginThrottle, SessionGuard, SessionStore};
use crate::socket::ConnectionMetrics;

use super::credential::{
    ChangeCredentialCommand, HashCredentialCommand, VerifyCredentialCommand,
};
use super::session::{AuthorizeCommand, LoginCommand, LogoutCommand, WhoAmICommand};
use super::system::{MetricsCommand, PingCommand};
use super::traits::Command;
use super::types::{CommandParams, CommandResult, ExecutionContext};

/// Registry of all available commands.
#[derive(Clone)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, Arc<dyn Command>>,
    guard: SessionGuard,
}

impl CommandRegistry {
    /// Create a new command registry with all built-in commands.
    ///
    /// `system.metrics` is only registered when connection metrics are given.
    pub fn new(
        hasher: Arc<PasswordHasher>,
        sessions: Arc<dyn SessionStore>,
        throttle: Arc<LoginThrottle>,
        metrics: Option<Arc<ConnectionMetrics>>,
    ) -> Self {
        let mut registry = Self {
            commands: HashMap::new(),
            guard: SessionGuard::new(),
        };

        // System commands
        registry.register(Arc::new(PingCommand));
        if let Some(metrics) = metrics {
            registry.register(Arc::new(MetricsCommand::new(
                metrics,
                Arc::clone(&sessions),
                Arc::clone(&throttle),
            )));
        }

        // Credential commands
        registry.register(Arc::new(HashCredentialCommand::new(Arc::clone(&hasher))));
        registry.register(Arc::new(VerifyCredentialCommand::new(
            Arc::clone(&hasher),
            Arc::clone(&throttle),
        )));
        registry.register(Arc::new(ChangeCredentialCommand::new(
            Arc::clone(&hasher),
            Arc::clone(&throttle),
        )));

        // Session commands
        registry.register(Arc::new(LoginCommand::new(
            hasher,
            Arc::clone(&sessions),
            throttle,
        )));
        registry.register(Arc::new(LogoutCommand::new(sessions)));
        registry.register(Arc::new(AuthorizeCommand));
        registry.register(Arc::new(WhoAmICommand));

        info!(
            count = registry.commands.len(),
            "Command registry initialized"
        );

        registry
    }

    /// Register a command.
    fn register(&mut self, command: Arc<dyn Command>) {
        let name = command.name();
        debug!(
            command = name,
            guarded = command.requires_session(),
            "Registering command"
        );
        self.commands.insert(name, command);
    }

    /// Get a command by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    /// Dispatch a request to the appropriate command handler.
    ///
    /// Protected commands pass through the session guard before their
    /// parameters are even looked at.
    pub fn dispatch(
        &self,
        ctx: &ExecutionContext,
        command_name: &str,
        params: CommandParams,
    ) -> Result<CommandResult, ServiceError> {
        let command = self
            .commands
            .get(command_name)
            .ok_or_else(|| ServiceError::Command {
                kind: CommandErrorKind::UnknownCommand {
                    name: command_name.to_string(),
                },
            })?;

        if command.requires_session() {
            if let Decision::Reject(_) = self.guard.authorize(&ctx.request) {
                return Err(ServiceError::Session {
                    kind: SessionErrorKind::Unauthorized,
                });
            }
        }

        command.validate(&params)?;
        command.execute(ctx, params)
    }

    /// Whether the named command should be written to the audit log.
    pub fn requires_audit(&self, command_name: &str) -> bool {
        self.commands
            .get(command_name)
            .map(|c| c.requires_audit())
            .unwrap_or(true)
    }

    /// List all registered command names.
    pub fn list_commands(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }
}
