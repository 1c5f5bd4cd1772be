// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use super::{FrameSource, IngestWorker, LogThrottle};
use crate::delivery::DeliveryService;
use crate::metrics::Metrics;
use crate::registry::Registry;
use crate::store::Store;

/// Replays a scripted sequence of reads, then blocks forever.
struct ScriptedSource {
    frames: VecDeque<anyhow::Result<Bytes>>,
    closed: Arc<AtomicBool>,
}

impl FrameSource for ScriptedSource {
    async fn read(&mut self) -> anyhow::Result<Bytes> {
        match self.frames.pop_front() {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct Ctx {
    store: Arc<Store>,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
    closed: Arc<AtomicBool>,
}

fn worker_with(
    frames: Vec<anyhow::Result<Bytes>>,
) -> anyhow::Result<(IngestWorker<ScriptedSource>, Ctx)> {
    let metrics = Arc::new(Metrics::new()?);
    let store = Arc::new(Store::new());
    let registry = Arc::new(Registry::new(Arc::clone(&metrics)));
    let delivery = Arc::new(DeliveryService::new(Arc::clone(&store), registry, Arc::clone(&metrics)));
    let shutdown = CancellationToken::new();
    let closed = Arc::new(AtomicBool::new(false));

    let source = ScriptedSource { frames: frames.into(), closed: Arc::clone(&closed) };
    let worker = IngestWorker::new(source, delivery, Arc::clone(&metrics), shutdown.clone());
    Ok((worker, Ctx { store, metrics, shutdown, closed }))
}

fn frame(json: &str) -> anyhow::Result<Bytes> {
    Ok(Bytes::copy_from_slice(json.as_bytes()))
}

async fn wait_for(mut cond: impl FnMut() -> bool) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .map_err(|_| anyhow::anyhow!("condition not reached in time"))
}

#[tokio::test]
async fn valid_frames_flow_to_the_store() -> anyhow::Result<()> {
    let (worker, ctx) = worker_with(vec![
        frame(r#"{"user_id":"u1","type":"message","title":"hi","content":"c","priority":1}"#),
        frame(r#"{"user_id":"u2","type":"alert","title":"t","content":"c","priority":3}"#),
    ])?;
    let handle = tokio::spawn(worker.run());

    wait_for(|| ctx.store.len() == 2).await?;
    assert_eq!(ctx.metrics.notifications_ingested.get(), 2);
    assert_eq!(ctx.store.find_by_user("u1").len(), 1);

    ctx.shutdown.cancel();
    handle.await?;
    assert!(ctx.closed.load(Ordering::SeqCst), "source is closed on exit");
    Ok(())
}

#[tokio::test]
async fn undecodable_frames_are_skipped() -> anyhow::Result<()> {
    // An unknown type fails decoding; the worker moves on to the next frame.
    let (worker, ctx) = worker_with(vec![
        frame(r#"{"id":"x","user_id":"u1","type":"bogus","title":"t","content":"c","priority":1}"#),
        frame("not json at all"),
        frame(r#"{"user_id":"u1","type":"system","title":"ok","content":"c","priority":0}"#),
    ])?;
    let handle = tokio::spawn(worker.run());

    wait_for(|| ctx.store.len() == 1).await?;
    assert!(ctx.store.find_by_id("x").is_none(), "rejected record is never stored");
    assert_eq!(ctx.metrics.ingest_decode_failures.get(), 2);

    ctx.shutdown.cancel();
    handle.await?;
    Ok(())
}

#[tokio::test]
async fn handler_failures_do_not_stop_the_worker() -> anyhow::Result<()> {
    let (worker, ctx) = worker_with(vec![
        frame(r#"{"user_id":"u1","type":"message","title":"","content":"c","priority":1}"#),
        frame(r#"{"user_id":"u1","type":"message","title":"good","content":"c","priority":1}"#),
    ])?;
    let handle = tokio::spawn(worker.run());

    wait_for(|| ctx.store.len() == 1).await?;
    let stored = ctx.store.find_by_user("u1");
    assert!(stored.first().is_some_and(|n| n.title == "good"));

    ctx.shutdown.cancel();
    handle.await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn read_errors_back_off_then_recover() -> anyhow::Result<()> {
    let (worker, ctx) = worker_with(vec![
        Err(anyhow::anyhow!("broker unreachable")),
        Err(anyhow::anyhow!("broker unreachable")),
        frame(r#"{"user_id":"u1","type":"message","title":"back","content":"c","priority":1}"#),
    ])?;
    let handle = tokio::spawn(worker.run());

    // Paused time fast-forwards the backoff sleeps.
    wait_for(|| ctx.store.len() == 1).await?;

    ctx.shutdown.cancel();
    handle.await?;
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_an_idle_worker() -> anyhow::Result<()> {
    let (worker, ctx) = worker_with(vec![])?;
    let handle = tokio::spawn(worker.run());

    ctx.shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle).await??;
    assert!(ctx.closed.load(Ordering::SeqCst));
    Ok(())
}

// ── LogThrottle ───────────────────────────────────────────────────────────

#[test]
fn throttle_suppresses_repeats_within_the_interval() {
    let mut throttle = LogThrottle::new(Duration::from_millis(50));
    assert!(throttle.should_log("down"));
    assert!(!throttle.should_log("down"), "identical cause is suppressed");
    assert!(throttle.should_log("different"), "a new cause logs immediately");

    let mut throttle = LogThrottle::new(Duration::from_millis(10));
    assert!(throttle.should_log("down"));
    std::thread::sleep(Duration::from_millis(20));
    assert!(throttle.should_log("down"), "cause logs again after the interval");
}
