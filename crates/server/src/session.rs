// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection session: a bounded outbox, a close latch, and the two
//! pumps that own the socket halves.
//!
//! The write pump drains the outbox and keeps the ping cadence; the read
//! pump tracks the pong deadline and discards inbound application frames.
//! Producers never touch the socket: they enqueue through [`Session::send`],
//! which serializes with the closer via the latch so nothing is enqueued
//! after the session is closed.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::registry::Registry;

/// Pending outbound frames per session.
pub const OUTBOX_CAPACITY: usize = 256;

/// Deadline for a single transport write (data or ping).
const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Deadline for the best-effort close control frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Heartbeat timing for one connection.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    /// Ping cadence.
    pub ping_period: Duration,
    /// How long after the last pong the read deadline expires.
    pub pong_wait: Duration,
}

struct Latch {
    closed: bool,
    outbox: Option<mpsc::Sender<String>>,
}

/// One live connection for one user.
pub struct Session {
    pub user_id: String,
    latch: Mutex<Latch>,
    cancel: CancellationToken,
}

impl Session {
    /// Build a session and its outbox receiver. The receiver is handed to
    /// [`Session::run`]; the cancel token is a child of `parent`, the
    /// force-close token cancelled once the shutdown drain window elapses.
    pub fn connect(
        user_id: impl Into<String>,
        parent: &CancellationToken,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        let session = Arc::new(Self {
            user_id: user_id.into(),
            latch: Mutex::new(Latch { closed: false, outbox: Some(tx) }),
            cancel: parent.child_token(),
        });
        (session, rx)
    }

    fn lock_latch(&self) -> MutexGuard<'_, Latch> {
        self.latch.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue a serialized frame. Never fails from the caller's point of
    /// view: a closed session drops the frame silently (the user is gone),
    /// and a full outbox is irrecoverable back-pressure that closes the
    /// session.
    pub fn send(&self, frame: String) {
        let mut latch = self.lock_latch();
        if latch.closed {
            return;
        }
        let Some(outbox) = latch.outbox.as_ref() else { return };
        match outbox.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(user_id = %self.user_id, "session outbox full, closing");
                self.close_locked(&mut latch);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Idempotent close: flips the latch, drops the outbox sender, and
    /// cancels the token so both pumps unblock. The write pump emits the
    /// close control frame and releases the transport.
    pub fn close(&self) {
        let mut latch = self.lock_latch();
        if latch.closed {
            return;
        }
        self.close_locked(&mut latch);
    }

    fn close_locked(&self, latch: &mut Latch) {
        latch.closed = true;
        latch.outbox = None;
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.lock_latch().closed
    }

    /// Run both pumps until the connection dies, the session is closed, or
    /// the process shuts down. Consumes the upgraded socket.
    pub async fn run(
        self: Arc<Self>,
        socket: WebSocket,
        outbox: mpsc::Receiver<String>,
        heartbeat: Heartbeat,
        registry: Arc<Registry>,
    ) {
        let (sink, stream) = socket.split();

        let writer = tokio::spawn(Arc::clone(&self).write_pump(
            sink,
            outbox,
            heartbeat.ping_period,
            Arc::clone(&registry),
        ));

        self.read_pump(stream, heartbeat.pong_wait).await;
        self.close();
        registry.unregister(&self.user_id, &self).await;

        let _ = writer.await;
    }

    /// Drain the outbox onto the transport and keep the ping cadence.
    /// Exits on write failure, on session close, or when the outbox sender
    /// is gone; the close control frame is attempted exactly once on the
    /// way out.
    async fn write_pump(
        self: Arc<Self>,
        mut sink: SplitSink<WebSocket, Message>,
        mut outbox: mpsc::Receiver<String>,
        ping_period: Duration,
        registry: Arc<Registry>,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + ping_period, ping_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            // Biased: once the session is closed, no further data frame may
            // reach the transport, even if the outbox still holds frames.
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    send_close_frame(&mut sink).await;
                    break;
                }
                frame = outbox.recv() => match frame {
                    Some(text) => {
                        match tokio::time::timeout(WRITE_WAIT, sink.send(Message::Text(text.into()))).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                tracing::debug!(user_id = %self.user_id, err = %e, "frame write failed");
                                break;
                            }
                            Err(_) => {
                                tracing::debug!(user_id = %self.user_id, "frame write deadline exceeded");
                                break;
                            }
                        }
                    }
                    None => {
                        send_close_frame(&mut sink).await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    match tokio::time::timeout(WRITE_WAIT, sink.send(Message::Ping(Bytes::new()))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::debug!(user_id = %self.user_id, err = %e, "ping write failed");
                            break;
                        }
                        Err(_) => {
                            tracing::debug!(user_id = %self.user_id, "ping write deadline exceeded");
                            break;
                        }
                    }
                }
            }
        }

        self.close();
        registry.unregister(&self.user_id, &self).await;
    }

    /// Watch the connection for liveness. The deadline starts at
    /// `pong_wait` and is refreshed only by pong frames; inbound
    /// application frames are discarded.
    async fn read_pump(&self, mut stream: SplitStream<WebSocket>, pong_wait: Duration) {
        let mut deadline = Instant::now() + pong_wait;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::debug!(user_id = %self.user_id, "pong deadline expired");
                    break;
                }
                msg = stream.next() => match msg {
                    Some(Ok(Message::Pong(_))) => {
                        deadline = Instant::now() + pong_wait;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(user_id = %self.user_id, err = %e, "read failed");
                        break;
                    }
                }
            }
        }
    }
}

/// Best-effort graceful close, bounded by [`CLOSE_GRACE`].
async fn send_close_frame(sink: &mut SplitSink<WebSocket, Message>) {
    let frame = CloseFrame { code: close_code::NORMAL, reason: Utf8Bytes::from_static("") };
    let _ = tokio::time::timeout(CLOSE_GRACE, sink.send(Message::Close(Some(frame)))).await;
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
