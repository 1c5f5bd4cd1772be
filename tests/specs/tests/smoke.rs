// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `notifyd` binary and exercise
//! the health, metrics, and WebSocket surfaces.

use std::time::Duration;

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use notifyd_specs::{notifyd_binary, ServerProcess};

const TIMEOUT: Duration = Duration::from_secs(10);

// -- HTTP ---------------------------------------------------------------------

#[tokio::test]
async fn health_and_metrics_respond() -> anyhow::Result<()> {
    let server = ServerProcess::spawn().await?;

    let body = reqwest::get(format!("{}/health", server.base_url())).await?.text().await?;
    assert_eq!(body, "OK");

    let metrics = reqwest::get(server.metrics_url()).await?.text().await?;
    assert!(metrics.contains("notifyd_connected_sessions"), "metrics body: {metrics}");
    Ok(())
}

// -- WebSocket ----------------------------------------------------------------

#[tokio::test]
async fn ws_requires_a_user_id() -> anyhow::Result<()> {
    let server = ServerProcess::spawn().await?;

    let result = tokio_tungstenite::connect_async(server.ws_url("")).await;
    let Err(tokio_tungstenite::tungstenite::Error::Http(response)) = result else {
        anyhow::bail!("expected an HTTP rejection");
    };
    assert_eq!(response.status().as_u16(), 400);
    Ok(())
}

#[tokio::test]
async fn reconnect_supersedes_the_first_connection() -> anyhow::Result<()> {
    let server = ServerProcess::spawn().await?;

    let (mut first, _) = tokio_tungstenite::connect_async(server.ws_url("userId=u1")).await?;
    let (second, _) = tokio_tungstenite::connect_async(server.ws_url("userId=u1")).await?;

    // The superseded connection receives a graceful close.
    let msg = tokio::time::timeout(TIMEOUT, first.next())
        .await
        .map_err(|_| anyhow::anyhow!("no close frame before timeout"))?
        .ok_or_else(|| anyhow::anyhow!("stream ended without a frame"))?;
    assert!(matches!(msg, Ok(Message::Close(_))), "got {msg:?}");

    drop(second);
    Ok(())
}

// -- Startup failures ---------------------------------------------------------

#[tokio::test]
async fn invalid_config_exits_nonzero() -> anyhow::Result<()> {
    // Empty config dir: no config.yaml at all.
    let config_dir = tempfile::tempdir()?;
    let status = std::process::Command::new(notifyd_binary())
        .env("CONFIG_PATH", config_dir.path())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()?;
    assert!(!status.success());
    Ok(())
}
