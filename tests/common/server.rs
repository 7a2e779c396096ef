//! Test server management.
//!
//! Spawns sanctiond instances for integration testing, each with its own
//! database and notification outbox in a temporary directory.

#![allow(dead_code)]

use super::client::TestClient;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::process::{Child, Command};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Password of the provisioned staff account and of every member created
/// through [`TestServer::create_member`].
pub const PASSWORD: &str = "hostel77";

/// Username of the provisioned staff account.
pub const STAFF: &str = "staff";

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    dir: TempDir,
}

impl TestServer {
    /// Spawn a server with a provisioned staff account.
    pub async fn spawn(port: u16) -> anyhow::Result<Self> {
        Self::spawn_with(port, true, "").await
    }

    /// Spawn a server with no account at all.
    pub async fn spawn_without_staff(port: u16) -> anyhow::Result<Self> {
        Self::spawn_with(port, false, "").await
    }

    /// Spawn a server, appending `extra` TOML tables to the generated config.
    pub async fn spawn_with(port: u16, with_staff: bool, extra: &str) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let staff = if with_staff {
            format!(
                r#"
[[staff]]
username = "{STAFF}"
email = "staff@example.com"
password = "{PASSWORD}"
"#
            )
        } else {
            String::new()
        };

        let config_content = format!(
            r#"
[server]
name = "test"
listen = "127.0.0.1:{port}"
metrics_port = 0

[database]
path = "{dir}/test.db"

[sanctions]
sweep_interval_secs = 1

[notify]
backend = "outbox"
path = "{dir}/outbox.jsonl"
{staff}
{extra}
"#,
            dir = dir.path().display(),
        );

        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_sanctiond"))
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .spawn()?;

        let server = Self { child, port, dir };
        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    /// Base URL of the member API.
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// An anonymous client.
    pub fn client(&self) -> TestClient {
        TestClient::new(&self.base_url())
    }

    /// A client logged in as `username`.
    pub async fn login(&self, username: &str) -> anyhow::Result<TestClient> {
        let mut client = self.client();
        client.login(username, PASSWORD).await?;
        Ok(client)
    }

    /// Every notification written so far.
    pub fn outbox(&self) -> anyhow::Result<Vec<Value>> {
        let path = self.dir.path().join("outbox.jsonl");
        if !path.exists() {
            return Ok(Vec::new());
        }
        std::fs::read_to_string(path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(anyhow::Error::from))
            .collect()
    }

    /// Notifications of `kind` sent to `recipient`.
    pub fn notifications(&self, recipient: &str, kind: &str) -> anyhow::Result<Vec<Value>> {
        Ok(self
            .outbox()?
            .into_iter()
            .filter(|n| n["recipient"] == recipient && n["kind"] == kind)
            .collect())
    }

    /// The latest confirmation token sent to `email`.
    pub fn confirmation_token(&self, email: &str) -> anyhow::Result<String> {
        self.notifications(email, "confirmation")?
            .last()
            .and_then(|n| n["context"]["token"].as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("no confirmation sent to {email}"))
    }

    /// Register and activate a member, returning its id.
    pub async fn create_member(&self, username: &str) -> anyhow::Result<i64> {
        let email = format!("{}@example.com", username.to_lowercase());
        let client = self.client();

        let reply = client
            .post(
                "/members",
                json!({ "username": username, "email": email, "password": PASSWORD }),
            )
            .await?;
        anyhow::ensure!(
            reply.status == StatusCode::CREATED,
            "registration of {username} failed: {}",
            reply.body
        );

        let token = self.confirmation_token(&email)?;
        let reply = client
            .post("/members/activation", json!({ "token": token }))
            .await?;
        anyhow::ensure!(reply.status == StatusCode::OK, "activation failed: {}", reply.body);

        reply.body["pk"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("activation response has no pk"))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
