//! Join handler: authenticates a join request and upgrades it to the
//! duplex transport.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;

use crate::http::response::{not_found, unauthorized};
use crate::session;
use crate::state::AppState;
use crate::store::JoinError;

const SUBPROTOCOL: &str = "tarpon";

pub async fn join_room(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(room): Path<String>,
    headers: HeaderMap,
) -> Response {
    let secret = extract_secret(&headers);
    let peer = match state.store.join_room(&room, &secret) {
        Ok(peer) => peer,
        Err(JoinError::RoomNotFound) => return not_found("Room not found"),
        Err(JoinError::Unauthorized) => return unauthorized("Unauthorized"),
    };

    let broker = state.broker.clone();
    let session_config = state.session_config;
    ws.protocols([SUBPROTOCOL])
        .max_message_size(session_config.max_message_size)
        .on_failed_upgrade(|e| {
            metrics::counter!("tarpon_ws_upgrade_failures_total").increment(1);
            tracing::error!(error = %e, "websocket upgrade failed");
        })
        .on_upgrade(move |socket| async move {
            session::run(peer.uid, room, broker, socket, session_config).await;
        })
}

/// Extracts the join secret: `Authorization: Bearer <secret>` header takes
/// priority, else the token following `access_token` among the advertised
/// WebSocket subprotocols, else the empty string (which `join_room` rejects).
fn extract_secret(headers: &HeaderMap) -> String {
    if let Some(bearer) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
    {
        return bearer.to_owned();
    }
    secret_from_subprotocols(headers)
}

fn extract_bearer(authorization: &str) -> Option<&str> {
    authorization.strip_prefix("Bearer").map(str::trim)
}

fn secret_from_subprotocols(headers: &HeaderMap) -> String {
    let Some(raw) = headers
        .get(axum::http::header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
    else {
        return String::new();
    };
    let tokens: Vec<&str> = raw.split(',').map(str::trim).collect();
    tokens
        .iter()
        .position(|&t| t == "access_token")
        .and_then(|i| tokens.get(i + 1))
        .map(|s| (*s).to_owned())
        .unwrap_or_default()
}
