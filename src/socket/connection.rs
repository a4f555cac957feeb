//! Per-connection handler.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::{sanitize_params, AuditEntry, AuditLogger};
use crate::commands::{CommandParams, CommandRegistry, ExecutionContext};
use crate::config::Settings;
use crate::error::{ProtocolErrorKind, ServiceError};
use crate::protocol::{read_message_with_timeout, write_message_with_timeout, Request, Response};
use crate::session::{RequestContext, SessionStore};

use super::ConnectionMetrics;

/// State shared by every connection task.
#[derive(Clone)]
pub struct ConnectionState {
    pub settings: Arc<Settings>,
    pub registry: Arc<CommandRegistry>,
    pub sessions: Arc<dyn SessionStore>,
    pub audit_logger: Option<Arc<AuditLogger>>,
    pub metrics: Arc<ConnectionMetrics>,
}

/// Handle a single client connection until it closes or times out.
///
/// Clients may send any number of requests over one connection; each gets
/// exactly one response.
pub async fn handle_connection(
    stream: UnixStream,
    state: ConnectionState,
) -> Result<(), ServiceError> {
    let (mut reader, mut writer) = stream.into_split();

    loop {
        match process_request(&mut reader, &mut writer, &state).await {
            Ok(()) => continue,
            Err(ServiceError::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed,
            }) => {
                debug!("Client disconnected");
                return Ok(());
            }
            Err(ServiceError::Protocol {
                kind: ProtocolErrorKind::ConnectionTimeout,
            }) => {
                warn!("Connection timed out");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Read one frame, run it, write one frame.
async fn process_request<R, W>(
    reader: &mut R,
    writer: &mut W,
    state: &ConnectionState,
) -> Result<(), ServiceError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let socket_timeout = state.settings.socket_timeout();
    let msg =
        read_message_with_timeout(reader, state.settings.limits.max_message_size, socket_timeout)
            .await?;

    let request_id = Uuid::new_v4();
    let start_time = Instant::now();

    // A bad frame body leaves the framing intact, so answer and keep going.
    let request: Request = match serde_json::from_slice(&msg) {
        Ok(request) => request,
        Err(e) => {
            let detail = malformed_request_detail(&e);
            warn!(request_id = %request_id, detail = %detail, "Malformed request");
            let response = Response::error(request_id, "PROTOCOL_ERROR", detail);
            state.metrics.record_request(false);
            return send(writer, &response, socket_timeout).await;
        }
    };

    // Resolve the session once; everything downstream sees this snapshot.
    let session = request
        .session_token
        .as_deref()
        .and_then(|token| state.sessions.load(token));
    let request_ctx = RequestContext::new(request_id, session);
    let user_id = request_ctx.user_id().map(String::from);

    info!(
        request_id = %request_id,
        command = %request.command,
        authenticated = user_id.is_some(),
        "Received request"
    );

    let audit = state
        .audit_logger
        .as_ref()
        .filter(|_| state.registry.requires_audit(&request.command))
        .map(|logger| {
            let entry = AuditEntry::new(
                Utc::now().to_rfc3339(),
                request_id,
                request.command.clone(),
                sanitize_params(&request.params),
                user_id.clone(),
            );
            (logger, entry)
        });

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let ctx = ExecutionContext::new(
        request_ctx,
        request.session_token.clone(),
        timestamp,
        request.command.clone(),
    );
    let params = CommandParams::new(request.params);

    // Key derivation is CPU bound; keep it off the async workers.
    let registry = Arc::clone(&state.registry);
    let command_name = request.command.clone();
    let result =
        tokio::task::spawn_blocking(move || registry.dispatch(&ctx, &command_name, params)).await;

    let duration_ms = elapsed_ms(start_time);
    let (response, entry) = match result {
        Ok(Ok(cmd_result)) => {
            info!(
                request_id = %request_id,
                command = %request.command,
                success = cmd_result.success,
                "Command executed"
            );

            if cmd_result.success {
                let data = cmd_result.data.unwrap_or_else(|| serde_json::json!({}));
                let entry = audit.map(|(logger, entry)| {
                    (logger, entry.succeeded(Some(sanitize_params(&data)), duration_ms))
                });
                (Response::success(request_id, data), entry)
            } else {
                let code = cmd_result
                    .error_code
                    .unwrap_or_else(|| "EXECUTION_ERROR".to_string());
                let message = cmd_result
                    .error_message
                    .unwrap_or_else(|| "Unknown error".to_string());
                let entry = audit
                    .map(|(logger, entry)| (logger, entry.failed(code.clone(), message.clone(), duration_ms)));
                (Response::error(request_id, code, message), entry)
            }
        }
        Ok(Err(e)) => {
            let code = e.code();
            if code == "EXECUTION_ERROR" {
                error!(
                    request_id = %request_id,
                    command = %request.command,
                    error = %e,
                    "Command execution failed"
                );
            } else {
                info!(
                    request_id = %request_id,
                    command = %request.command,
                    code,
                    "Request rejected"
                );
            }
            let entry =
                audit.map(|(logger, entry)| (logger, entry.failed(code, e.to_string(), duration_ms)));
            (Response::error(request_id, code, e.to_string()), entry)
        }
        Err(e) => {
            error!(
                request_id = %request_id,
                command = %request.command,
                error = %e,
                "Command task panicked"
            );
            let entry = audit.map(|(logger, entry)| {
                (logger, entry.failed("INTERNAL_ERROR", "Command execution failed", duration_ms))
            });
            (
                Response::error(request_id, "INTERNAL_ERROR", "Command execution failed"),
                entry,
            )
        }
    };

    if let Some((logger, entry)) = entry {
        if let Err(e) = logger.log(&entry) {
            error!(error = %e, "Failed to write audit log entry");
        }
    }

    state.metrics.record_request(response.success);
    send(writer, &response, socket_timeout).await
}

async fn send<W>(writer: &mut W, response: &Response, timeout: Duration) -> Result<(), ServiceError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = serde_json::to_vec(response)?;
    write_message_with_timeout(writer, &bytes, timeout).await
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Describe a rejected frame by error category and position only.
///
/// serde_json messages can quote the offending value, which may be a password.
fn malformed_request_detail(e: &serde_json::Error) -> String {
    format!(
        "{:?} error at line {} column {}",
        e.classify(),
        e.line(),
        e.column()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error(body: &str) -> serde_json::Error {
        match serde_json::from_str::<Request>(body) {
            Err(e) => e,
            Ok(_) => panic!("body should not parse: {}", body),
        }
    }

    #[test]
    fn test_malformed_detail_omits_values() {
        // serde_json's own message would read "invalid type: integer `424242` ..."
        let e = parse_error(r#"{"command": "session.login", "session_token": 424242}"#);
        assert!(e.to_string().contains("424242"));

        let detail = malformed_request_detail(&e);
        assert!(detail.starts_with("Data error"), "{}", detail);
        assert!(!detail.contains("424242"));
    }

    #[test]
    fn test_malformed_detail_syntax_position() {
        let detail = malformed_request_detail(&parse_error("{not json"));
        assert!(detail.starts_with("Syntax error at line 1 column"), "{}", detail);
    }
}
