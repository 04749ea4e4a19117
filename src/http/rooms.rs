//! Admin surface: `POST /rooms`, `POST /rooms/{room}/peers`.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::http::response::{bad_request, conflict, created, ok};
use crate::message::SERVER_UID;
use crate::state::AppState;
use crate::store::Peer;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub uid: String,
}

pub async fn create_room(State(state): State<AppState>, Json(req): Json<CreateRoomRequest>) -> Response {
    if let Err(msg) = check_length(&req.uid, 1, 40, "uid") {
        return bad_request(msg);
    }
    if state.store.create_room(&req.uid) {
        created("Created")
    } else {
        conflict("uid: already exists")
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterPeerRequest {
    pub uid: String,
    pub secret: String,
}

pub async fn register_peer(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(req): Json<RegisterPeerRequest>,
) -> Response {
    if let Err(msg) = check_length(&req.uid, 1, 40, "uid") {
        return bad_request(msg);
    }
    if req.uid == SERVER_UID {
        return bad_request(format!("your uid cannot be '{SERVER_UID}'"));
    }
    if let Err(msg) = check_length(&req.secret, 24, 100, "secret") {
        return bad_request(msg);
    }

    let peer = Peer { uid: req.uid, secret: req.secret };
    if state.store.register_peer(&room, peer) {
        created("Created")
    } else {
        ok("OK")
    }
}

fn check_length(value: &str, lower: usize, upper: usize, name: &str) -> Result<(), String> {
    let len = value.len();
    if len < lower || len > upper {
        Err(format!("{name}: must be between {lower} and {upper} bytes"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use crate::store::InMemoryRoomStore;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(InMemoryRoomStore::new()), SessionConfig::default())
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn create_room_rejects_empty_uid() {
        let response = create_room(State(state()), Json(CreateRoomRequest { uid: String::new() })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_room_then_duplicate_is_conflict() {
        let st = state();
        let first = create_room(State(st.clone()), Json(CreateRoomRequest { uid: "r".into() })).await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = create_room(State(st), Json(CreateRoomRequest { uid: "r".into() })).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_peer_rejects_reserved_uid() {
        let st = state();
        let response = register_peer(
            State(st),
            Path("r".into()),
            Json(RegisterPeerRequest { uid: "tarpon".into(), secret: "x".repeat(24) }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_peer_rejects_short_secret() {
        let st = state();
        let response = register_peer(
            State(st),
            Path("r".into()),
            Json(RegisterPeerRequest { uid: "a".into(), secret: "short".into() }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_peer_new_is_created_update_is_ok() {
        let st = state();
        let secret = "x".repeat(24);
        let first = register_peer(
            State(st.clone()),
            Path("r".into()),
            Json(RegisterPeerRequest { uid: "a".into(), secret: secret.clone() }),
        )
        .await;
        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(body_text(first).await, "Created\n");

        let second = register_peer(
            State(st),
            Path("r".into()),
            Json(RegisterPeerRequest { uid: "a".into(), secret }),
        )
        .await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(body_text(second).await, "OK\n");
    }
}
