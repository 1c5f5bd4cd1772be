// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `notifyd` binary as a subprocess with a temporary
//! `config.yaml` and exercises it over HTTP and WebSocket. The configured
//! broker address points at a closed port, so the ingest worker just backs
//! off in the background.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Resolve the path to the compiled `notifyd` binary.
pub fn notifyd_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("notifyd")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A running `notifyd` process that is killed on drop.
pub struct ServerProcess {
    child: Child,
    pub port: u16,
    pub metrics_port: u16,
    _config_dir: tempfile::TempDir,
}

impl ServerProcess {
    /// Spawn the binary with a generated config and wait for `/health`.
    pub async fn spawn() -> anyhow::Result<Self> {
        let port = free_port()?;
        let metrics_port = free_port()?;

        let config_dir = tempfile::tempdir()?;
        let config = format!(
            "server:\n  port: {port}\n  metrics_port: {metrics_port}\n\
             kafka:\n  brokers: [\"127.0.0.1:1\"]\n  topic: notifications\n\
             log:\n  level: error\n"
        );
        std::fs::write(config_dir.path().join("config.yaml"), config)?;

        let child = Command::new(notifyd_binary())
            .env("CONFIG_PATH", config_dir.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let server = Self { child, port, metrics_port, _config_dir: config_dir };
        server.wait_healthy().await?;
        Ok(server)
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn ws_url(&self, query: &str) -> String {
        if query.is_empty() {
            format!("ws://127.0.0.1:{}/ws", self.port)
        } else {
            format!("ws://127.0.0.1:{}/ws?{query}", self.port)
        }
    }

    pub fn metrics_url(&self) -> String {
        format!("http://127.0.0.1:{}/metrics", self.metrics_port)
    }

    async fn wait_healthy(&self) -> anyhow::Result<()> {
        let url = format!("{}/health", self.base_url());
        let deadline = Instant::now() + Duration::from_secs(15);
        let client = reqwest::Client::new();
        loop {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            if Instant::now() > deadline {
                anyhow::bail!("server did not become healthy in time");
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
