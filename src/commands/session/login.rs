//! `session.login`: verify a password and open an authenticated session.

use std::sync::Arc;

use tracing::{info, warn};

use crate::credential::PasswordHasher;
use crate::error::ServiceError;
use crate::session::{LoginThrottle, SessionStore};

use super::super::traits::Command;
use super::super::types::{CommandParams, CommandResult, ExecutionContext};

/// Log a user in.
///
/// The storefront looks up the user's stored record and passes it along with
/// the attempt. On success any session the client already carried is
/// destroyed and a fresh token is issued.
pub struct LoginCommand {
    hasher: Arc<PasswordHasher>,
    sessions: Arc<dyn SessionStore>,
    throttle: Arc<LoginThrottle>,
}

impl LoginCommand {
    pub fn new(
        hasher: Arc<PasswordHasher>,
        sessions: Arc<dyn SessionStore>,
        throttle: Arc<LoginThrottle>,
    ) -> Self {
        Self {
            hasher,
            sessions,
            throttle,
        }
    }
}

impl Command for LoginCommand {
    fn name(&self) -> &'static str {
        "session.login"
    }

    fn validate(&self, params: &CommandParams) -> Result<(), ServiceError> {
        params.require_non_empty("user_id")?;
        params.require_string("password")?;
        params.require_string("record")?;
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandResult, ServiceError> {
        let user_id = params.get_string("user_id")?;
        let password = params.get_string("password")?;
        let record = params.get_string("record")?;

        // Reserve before hashing so parallel guesses cannot overshoot the limit.
        let Some(attempt) = self.throttle.try_acquire(&user_id) else {
            warn!(request_id = %ctx.request_id(), user_id = %user_id, "Login throttled");
            return Ok(CommandResult::failure(
                "LOGIN_THROTTLED",
                "Too many failed login attempts",
            ));
        };

        if !self.hasher.verify(&password, &record) {
            attempt.failed();
            info!(request_id = %ctx.request_id(), user_id = %user_id, "Login rejected");
            return Ok(CommandResult::failure(
                "INVALID_CREDENTIALS",
                "Password did not match",
            ));
        }

        attempt.succeeded();

        // Rotate: never upgrade a token the client already held.
        if let Some(previous) = ctx.session_token.as_deref() {
            self.sessions.destroy(previous);
        }

        let token = self.sessions.create(&user_id)?;
        info!(request_id = %ctx.request_id(), user_id = %user_id, "Session created");

        Ok(CommandResult::success(serde_json::json!({
            "token": token.into_string(),
            "user_id": user_id,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{anonymous_context, test_hasher, test_store};
    use std::time::Duration;

    fn login_params(user_id: &str, password: &str, record: &str) -> CommandParams {
        CommandParams::new(serde_json::json!({
            "user_id": user_id,
            "password": password,
            "record": record,
        }))
    }

    #[test]
    fn test_login_success_creates_session() {
        let hasher = test_hasher();
        let store = test_store();
        let record = hasher.hash("Admin123!@#").unwrap().to_string();
        let throttle = Arc::new(LoginThrottle::new(3, Duration::from_secs(60)));
        let cmd = LoginCommand::new(hasher, store.clone(), throttle);

        let result = cmd
            .execute(
                &anonymous_context("session.login"),
                login_params("u1", "Admin123!@#", &record),
            )
            .unwrap();
        assert!(result.success);

        let data = result.data.unwrap();
        assert_eq!(data["user_id"], "u1");
        let token = data["token"].as_str().unwrap();
        assert_eq!(store.load(token).unwrap().user_id(), Some("u1"));
    }

    #[test]
    fn test_login_wrong_password() {
        let hasher = test_hasher();
        let store = test_store();
        let record = hasher.hash("Admin123!@#").unwrap().to_string();
        let throttle = Arc::new(LoginThrottle::new(3, Duration::from_secs(60)));
        let cmd = LoginCommand::new(hasher, store.clone(), throttle);

        let result = cmd
            .execute(
                &anonymous_context("session.login"),
                login_params("u1", "wrongpass", &record),
            )
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error_code.as_deref(), Some("INVALID_CREDENTIALS"));
        assert_eq!(store.active_sessions(), 0);
    }

    #[test]
    fn test_login_throttled_after_failures() {
        let hasher = test_hasher();
        let record = hasher.hash("Admin123!@#").unwrap().to_string();
        let throttle = Arc::new(LoginThrottle::new(2, Duration::from_secs(60)));
        let cmd = LoginCommand::new(hasher, test_store(), throttle);
        let ctx = anonymous_context("session.login");

        for _ in 0..2 {
            let result = cmd
                .execute(&ctx, login_params("u1", "wrongpass", &record))
                .unwrap();
            assert_eq!(result.error_code.as_deref(), Some("INVALID_CREDENTIALS"));
        }

        // Even the right password is refused while throttled
        let result = cmd
            .execute(&ctx, login_params("u1", "Admin123!@#", &record))
            .unwrap();
        assert_eq!(result.error_code.as_deref(), Some("LOGIN_THROTTLED"));
    }

    #[test]
    fn test_parallel_guesses_respect_limit() {
        use std::sync::Barrier;
        use std::thread;

        const THREADS: usize = 16;
        let hasher = test_hasher();
        let record = hasher.hash("Admin123!@#").unwrap().to_string();
        let throttle = Arc::new(LoginThrottle::new(2, Duration::from_secs(600)));
        let cmd = LoginCommand::new(hasher, test_store(), throttle);
        let barrier = Barrier::new(THREADS);

        let codes: Vec<String> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cmd.execute(
                            &anonymous_context("session.login"),
                            login_params("victim", "wrongpass", &record),
                        )
                        .unwrap()
                        .error_code
                        .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let verified = codes.iter().filter(|c| *c == "INVALID_CREDENTIALS").count();
        let throttled = codes.iter().filter(|c| *c == "LOGIN_THROTTLED").count();
        assert_eq!(verified, 2);
        assert_eq!(throttled, THREADS - 2);
    }

    #[test]
    fn test_login_rotates_existing_token() {
        let hasher = test_hasher();
        let store = test_store();
        let record = hasher.hash("pw").unwrap().to_string();
        let throttle = Arc::new(LoginThrottle::new(3, Duration::from_secs(60)));
        let cmd = LoginCommand::new(hasher, store.clone(), throttle);

        let old = store.create("u1").unwrap();
        let mut ctx = anonymous_context("session.login");
        ctx.session_token = Some(old.as_str().to_string());

        let result = cmd.execute(&ctx, login_params("u1", "pw", &record)).unwrap();
        assert!(result.success);
        assert!(store.load(old.as_str()).is_none());
        assert_eq!(store.active_sessions(), 1);
    }

    #[test]
    fn test_validate_rejects_blank_user() {
        let cmd = LoginCommand::new(
            test_hasher(),
            test_store(),
            Arc::new(LoginThrottle::new(3, Duration::from_secs(60))),
        );
        assert!(cmd.validate(&login_params("", "pw", "a1:b2")).is_err());
        assert!(cmd
            .validate(&CommandParams::new(serde_json::json!({"user_id": "u1"})))
            .is_err());
    }
}
