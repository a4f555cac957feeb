//! Integration tests for the storefront auth daemon.
//!
//! These tests start a real listener and talk to it over the Unix socket the
//! same way the storefront backend does.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

use storefront_authd::config::Settings;
use storefront_authd::session::MemorySessionStore;
use storefront_authd::socket::SocketListener;

const LOGIN_MAX_ATTEMPTS: usize = 3;

/// Test daemon instance.
struct TestDaemon {
    socket_path: PathBuf,
    audit_path: PathBuf,
    _temp_dir: TempDir,
    shutdown: Arc<tokio::sync::Notify>,
}

impl TestDaemon {
    async fn start() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let socket_path = temp_dir.path().join("authd.sock");
        let audit_path = temp_dir.path().join("audit.log");

        let config = format!(
            r#"
[socket]
path = "{socket}"
permissions = "0600"

[credentials]
iterations = 1000

[security]
login_max_attempts = {attempts}
login_window_seconds = 60

[logging]
level = "warn"

[audit]
enabled = true
log_path = "{audit}"
"#,
            socket = socket_path.display(),
            attempts = LOGIN_MAX_ATTEMPTS,
            audit = audit_path.display(),
        );
        let settings = Arc::new(Settings::from_toml_str(&config).expect("Invalid test config"));

        let sessions = Arc::new(MemorySessionStore::new(settings.session_ttl()));
        let listener = SocketListener::bind(Arc::clone(&settings), sessions)
            .await
            .expect("Failed to bind socket");

        let shutdown = Arc::new(tokio::sync::Notify::new());
        let shutdown_for_run = Arc::clone(&shutdown);

        tokio::spawn(async move {
            if let Err(e) = listener.run(shutdown_for_run).await {
                eprintln!("Listener error: {}", e);
            }
        });

        // Wait for socket to be ready
        tokio::time::sleep(Duration::from_millis(200)).await;

        Self {
            socket_path,
            audit_path,
            _temp_dir: temp_dir,
            shutdown,
        }
    }

    fn connect(&self) -> UnixStream {
        let stream = UnixStream::connect(&self.socket_path).expect("Failed to connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(30)))
            .expect("Failed to set read timeout");
        stream
            .set_write_timeout(Some(Duration::from_secs(30)))
            .expect("Failed to set write timeout");
        stream
    }

    /// Send one request on a fresh connection.
    fn call(&self, command: &str, params: Value, token: Option<&str>) -> Value {
        let mut stream = self.connect();
        let mut request = json!({"command": command, "params": params});
        if let Some(token) = token {
            request["session_token"] = json!(token);
        }
        write_frame(&mut stream, &serde_json::to_vec(&request).unwrap());
        read_frame(&mut stream)
    }

    fn hash(&self, password: &str) -> String {
        let response = self.call("credential.hash", json!({"password": password}), None);
        assert_eq!(response["success"], true, "hash failed: {}", response);
        response["data"]["record"].as_str().unwrap().to_string()
    }

    fn login(&self, user_id: &str, password: &str, record: &str) -> Value {
        self.call(
            "session.login",
            json!({"user_id": user_id, "password": password, "record": record}),
            None,
        )
    }

    async fn stop(self) {
        self.shutdown.notify_waiters();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

fn write_frame(stream: &mut UnixStream, body: &[u8]) {
    let length = u32::try_from(body.len()).unwrap();
    stream.write_all(&length.to_be_bytes()).unwrap();
    stream.write_all(body).unwrap();
    stream.flush().unwrap();
}

fn read_frame(stream: &mut UnixStream) -> Value {
    let mut length_bytes = [0u8; 4];
    stream.read_exact(&mut length_bytes).unwrap();
    let mut body = vec![0u8; u32::from_be_bytes(length_bytes) as usize];
    stream.read_exact(&mut body).unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn error_code(response: &Value) -> &str {
    response["error"]["code"].as_str().unwrap_or_default()
}

// ============================================================================
// Transport
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping() {
    let daemon = TestDaemon::start().await;
    assert!(daemon.socket_path.exists(), "Socket file should exist");

    let response = daemon.call("system.ping", json!({}), None);
    assert_eq!(response["success"], true);
    assert_eq!(response["data"]["pong"], true);
    assert!(response["request_id"].is_string());

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_many_requests_on_one_connection() {
    let daemon = TestDaemon::start().await;
    let mut stream = daemon.connect();

    // Garbage body, then a valid request on the same connection
    write_frame(&mut stream, b"{not json");
    let response = read_frame(&mut stream);
    assert_eq!(response["success"], false);
    assert_eq!(error_code(&response), "PROTOCOL_ERROR");

    let ping = serde_json::to_vec(&json!({"command": "system.ping"})).unwrap();
    write_frame(&mut stream, &ping);
    let response = read_frame(&mut stream);
    assert_eq!(response["success"], true);

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_command() {
    let daemon = TestDaemon::start().await;

    let response = daemon.call("store.checkout", json!({}), None);
    assert_eq!(error_code(&response), "UNKNOWN_COMMAND");
    assert_eq!(response["error"]["message"], "Unknown command");

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_metrics() {
    let daemon = TestDaemon::start().await;
    let record = daemon.hash("pw");
    let token = daemon.login("u1", "pw", &record)["data"]["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = daemon.call("system.metrics", json!({}), Some(&token));
    assert_eq!(response["success"], true);
    assert_eq!(response["data"]["active_sessions"], 1);
    assert!(response["data"]["requests_total"].as_u64().unwrap() >= 2);

    daemon.stop().await;
}

// ============================================================================
// Credentials
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hash_and_verify() {
    let daemon = TestDaemon::start().await;

    let record = daemon.hash("Admin123!@#");
    let (salt, digest) = record.split_once(':').unwrap();
    assert_eq!(salt.len(), 32);
    assert_eq!(digest.len(), 64);

    let ok = daemon.call(
        "credential.verify",
        json!({"password": "Admin123!@#", "record": record}),
        None,
    );
    assert_eq!(ok["data"]["valid"], true);

    let bad = daemon.call(
        "credential.verify",
        json!({"password": "wrongpass", "record": record}),
        None,
    );
    assert_eq!(bad["success"], true);
    assert_eq!(bad["data"]["valid"], false);

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_record_verifies_false() {
    let daemon = TestDaemon::start().await;

    for record in ["nocolon", ":abcd", "zz:abcd", ""] {
        let response = daemon.call(
            "credential.verify",
            json!({"password": "pw", "record": record}),
            None,
        );
        assert_eq!(response["success"], true, "record {:?}", record);
        assert_eq!(response["data"]["valid"], false, "record {:?}", record);
    }

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_password_is_validation_error() {
    let daemon = TestDaemon::start().await;

    let response = daemon.call("credential.hash", json!({}), None);
    assert_eq!(error_code(&response), "VALIDATION_ERROR");

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_change_password_requires_session() {
    let daemon = TestDaemon::start().await;
    let record = daemon.hash("old-pass");
    let params = json!({
        "current_password": "old-pass",
        "record": record,
        "new_password": "new-pass",
    });

    let response = daemon.call("credential.change", params.clone(), None);
    assert_eq!(error_code(&response), "UNAUTHORIZED");

    let token = daemon.login("u1", "old-pass", &record)["data"]["token"]
        .as_str()
        .unwrap()
        .to_string();
    let response = daemon.call("credential.change", params, Some(&token));
    assert_eq!(response["success"], true);
    let new_record = response["data"]["record"].as_str().unwrap();

    let verify = daemon.call(
        "credential.verify",
        json!({"password": "new-pass", "record": new_record}),
        None,
    );
    assert_eq!(verify["data"]["valid"], true);

    daemon.stop().await;
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_login_whoami_logout() {
    let daemon = TestDaemon::start().await;
    let record = daemon.hash("Admin123!@#");

    let login = daemon.login("u1", "Admin123!@#", &record);
    assert_eq!(login["success"], true);
    assert_eq!(login["data"]["user_id"], "u1");
    let token = login["data"]["token"].as_str().unwrap().to_string();

    let whoami = daemon.call("session.whoami", json!({}), Some(&token));
    assert_eq!(whoami["data"]["user_id"], "u1");

    let authorize = daemon.call("session.authorize", json!({}), Some(&token));
    assert_eq!(authorize["data"]["authorized"], true);

    let logout = daemon.call("session.logout", json!({}), Some(&token));
    assert_eq!(logout["data"]["logged_out"], true);

    let whoami = daemon.call("session.whoami", json!({}), Some(&token));
    assert_eq!(error_code(&whoami), "UNAUTHORIZED");

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_authorize_rejects_missing_or_unknown_token() {
    let daemon = TestDaemon::start().await;

    let response = daemon.call("session.authorize", json!({}), None);
    assert_eq!(response["success"], false);
    assert_eq!(error_code(&response), "UNAUTHORIZED");
    assert_eq!(response["error"]["message"], "Unauthorized");

    let response = daemon.call("session.authorize", json!({}), Some("deadbeef"));
    assert_eq!(error_code(&response), "UNAUTHORIZED");

    daemon.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wrong_password_then_throttle() {
    let daemon = TestDaemon::start().await;
    let record = daemon.hash("Admin123!@#");

    for _ in 0..LOGIN_MAX_ATTEMPTS {
        let response = daemon.login("u1", "wrongpass", &record);
        assert_eq!(error_code(&response), "INVALID_CREDENTIALS");
        assert_eq!(response["error"]["message"], "Invalid credentials");
    }

    let response = daemon.login("u1", "Admin123!@#", &record);
    assert_eq!(error_code(&response), "LOGIN_THROTTLED");

    // Other accounts are unaffected
    let response = daemon.login("u2", "Admin123!@#", &record);
    assert_eq!(response["success"], true);

    daemon.stop().await;
}

// ============================================================================
// Audit
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_audit_log_never_contains_secrets() {
    let daemon = TestDaemon::start().await;
    let record = daemon.hash("Sup3rSecret!");
    let login = daemon.login("u1", "Sup3rSecret!", &record);
    let token = login["data"]["token"].as_str().unwrap().to_string();

    let content = std::fs::read_to_string(&daemon.audit_path).unwrap();
    assert!(content.contains("session.login"));
    assert!(content.contains("credential.hash"));
    assert!(!content.contains("Sup3rSecret!"));
    assert!(!content.contains(&record));
    assert!(!content.contains(&token));

    daemon.stop().await;
}
