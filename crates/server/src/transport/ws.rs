// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket gateway: upgrades `/ws` connections and hands them to a
//! session. The user id on the query string is trusted; there is no
//! handshake auth in this service.

use std::sync::Arc;

use axum::extract::ws::WebSocket;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::session::{Heartbeat, Session};
use crate::state::AppState;

/// Query parameters for the `/ws` upgrade.
#[derive(Debug, Clone, Deserialize)]
pub struct WsQuery {
    #[serde(rename = "userId", default)]
    pub user_id: String,
}

/// `GET /ws?userId=<id>`: upgrade and attach a delivery session.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    if query.user_id.is_empty() {
        tracing::warn!("connection attempt without a user id");
        return (StatusCode::BAD_REQUEST, "User ID required").into_response();
    }

    let ws = ws
        .write_buffer_size(state.config.websocket.write_buffer_size)
        .max_message_size(state.config.websocket.max_message_size)
        .on_failed_upgrade(|err| {
            tracing::warn!(err = %err, "websocket upgrade failed");
        });

    let user_id = query.user_id;
    ws.on_upgrade(move |socket| handle_socket(state, user_id, socket)).into_response()
}

/// Construct the session, register it, and run the pumps until the
/// connection ends.
async fn handle_socket(state: Arc<AppState>, user_id: String, socket: WebSocket) {
    tracing::info!(user_id, "establishing websocket session");

    let (session, outbox) = Session::connect(user_id, &state.session_cancel);
    state.registry.register(Arc::clone(&session)).await;

    let heartbeat = Heartbeat {
        ping_period: state.config.ping_period(),
        pong_wait: state.config.pong_wait(),
    };
    session.run(socket, outbox, heartbeat, Arc::clone(&state.registry)).await;
}
