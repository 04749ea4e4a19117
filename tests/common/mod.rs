use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use tarpon::session::SessionConfig;
use tarpon::store::InMemoryRoomStore;
use tarpon::AppState;

/// Fast session constants so integration tests don't wait on production
/// ping/pong timings: a 16-message queue is still the production size,
/// but the watchdog windows are shrunk to keep the suite quick.
pub fn fast_session_config() -> SessionConfig {
    SessionConfig {
        write_wait: Duration::from_millis(200),
        pong_wait: Duration::from_millis(500),
        ping_period: Duration::from_millis(150),
        max_message_size: 65_536,
        queue_capacity: 16,
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
}

impl TestServer {
    pub fn ws_url(&self, room: &str) -> String {
        format!("ws://{}/rooms/{room}/ws", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

/// Binds a real listener and runs the full router in the background, the
/// same way a production deployment would, so tests drive the actual HTTP
/// and WebSocket surface end to end rather than calling handlers directly.
pub async fn spawn_server() -> TestServer {
    spawn_server_with_session_config(fast_session_config()).await
}

pub async fn spawn_server_with_session_config(session_config: SessionConfig) -> TestServer {
    let store = Arc::new(InMemoryRoomStore::new());
    let state = AppState::new(store, session_config);
    let router = tarpon::build_router(state, None);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });

    TestServer { addr }
}

pub async fn create_room(server: &TestServer, room: &str) {
    let client = reqwest::Client::new();
    let response = client
        .post(server.http_url("/rooms"))
        .json(&serde_json::json!({ "uid": room }))
        .send()
        .await
        .expect("create_room request");
    assert_eq!(response.status(), StatusCode::CREATED);
}

pub async fn register_peer(server: &TestServer, room: &str, uid: &str, secret: &str) {
    let client = reqwest::Client::new();
    let response = client
        .post(server.http_url(&format!("/rooms/{room}/peers")))
        .json(&serde_json::json!({ "uid": uid, "secret": secret }))
        .send()
        .await
        .expect("register_peer request");
    assert!(response.status().is_success());
}

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Thin wrapper over a `tokio-tungstenite` connection that speaks the wire
/// protocol's `{from, to, payload}` envelope and skips protocol-level
/// ping/pong frames when reading.
#[derive(Debug)]
pub struct WsTestClient {
    stream: WsStream,
}

impl WsTestClient {
    pub async fn connect(server: &TestServer, room: &str, secret: &str) -> Result<Self, StatusCode> {
        let request = Request::builder()
            .uri(server.ws_url(room))
            .header("Host", server.addr.to_string())
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Key", generate_key())
            .header("Authorization", format!("Bearer {secret}"))
            .body(())
            .expect("build request");

        match tokio_tungstenite::connect_async(request).await {
            Ok((stream, _response)) => Ok(Self { stream }),
            Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
                Err(StatusCode::from_u16(response.status().as_u16()).expect("valid status"))
            }
            Err(e) => panic!("unexpected connect error: {e}"),
        }
    }

    pub async fn send_json(&mut self, to: &str, payload: Value) {
        use futures_util::SinkExt;
        let frame = serde_json::json!({ "to": to, "payload": payload });
        self.stream
            .send(WsMessage::Text(frame.to_string()))
            .await
            .expect("send");
    }

    pub async fn send_raw(&mut self, text: &str) {
        use futures_util::SinkExt;
        self.stream.send(WsMessage::Text(text.to_owned())).await.expect("send raw");
    }

    /// Reads the next application message, transparently skipping Ping/Pong
    /// frames. Returns `None` if the connection is closed before a text
    /// frame arrives.
    pub async fn recv_json(&mut self) -> Option<Value> {
        self.recv_json_timeout(Duration::from_secs(2)).await
    }

    pub async fn recv_json_timeout(&mut self, timeout: Duration) -> Option<Value> {
        use futures_util::StreamExt;
        loop {
            let next = tokio::time::timeout(timeout, self.stream.next()).await.ok()?;
            match next? {
                Ok(WsMessage::Text(text)) => return Some(serde_json::from_str(&text).expect("valid json")),
                Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => continue,
                Ok(WsMessage::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    pub async fn close(mut self) {
        use futures_util::SinkExt;
        let _ = self.stream.close(None).await;
    }
}
