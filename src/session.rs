//! The per-peer duplex session: handshake, read loop, write loop,
//! ping/pong liveness, and ordered teardown.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsFrame, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::broker::{Broker, Subscriber};
use crate::message::{self, ClientFrame, Message};

/// Tunable liveness and back-pressure constants, overridable via [`crate::config::TarponConfig`].
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub write_wait: Duration,
    pub pong_wait: Duration,
    pub ping_period: Duration,
    pub max_message_size: usize,
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let pong_wait = Duration::from_secs(60);
        Self {
            write_wait: Duration::from_secs(20),
            pong_wait,
            ping_period: pong_wait.mul_f64(0.9),
            max_message_size: 65_536,
            queue_capacity: 16,
        }
    }
}

/// The broker-facing capability for a live session. Holds only the
/// bounded outbound queue; the socket itself belongs exclusively to the
/// write task.
pub struct Session {
    uid: String,
    room: String,
    outbound_tx: mpsc::Sender<Message>,
}

impl Subscriber for Session {
    fn id(&self) -> &str {
        &self.uid
    }

    /// Non-blocking by construction: `try_send` never awaits. On a full
    /// queue the message is dropped and logged at WARN; the broker's
    /// dispatch path is never slowed down by a stalled peer.
    fn enqueue(&self, msg: Message) {
        match self.outbound_tx.try_send(msg) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::counter!("tarpon_messages_dropped_total", "reason" => "queue_full")
                    .increment(1);
                warn!(room = %self.room, peer = %self.uid, "outbound queue full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Write task already exited; the read task is tearing this
                // session down, nothing left to deliver to.
            }
        }
    }
}

/// Drives one peer's connection end to end: publishes `peer_connected`,
/// registers with the broker, runs the read and write tasks, and performs
/// ordered teardown. Returns once both tasks have exited.
pub async fn run(uid: String, room: String, broker: Arc<Broker>, socket: WebSocket, config: SessionConfig) {
    if let Some(connected) = message::peer_connected(&uid) {
        broker.send(&room, connected);
    } else {
        error!(room = %room, peer = %uid, "failed to marshal peer_connected control message");
    }

    let (outbound_tx, outbound_rx) = mpsc::channel(config.queue_capacity);
    let session: Arc<dyn Subscriber> = Arc::new(Session {
        uid: uid.clone(),
        room: room.clone(),
        outbound_tx,
    });
    broker.register(&room, session.clone());
    metrics::counter!("tarpon_sessions_started_total").increment(1);
    metrics::gauge!("tarpon_active_sessions").increment(1.0);

    let (sink, stream) = socket.split();
    let (stop_tx, stop_rx) = oneshot::channel();

    let write_handle = tokio::spawn(write_loop(sink, outbound_rx, stop_rx, config));
    read_loop(stream, &broker, &room, &uid, config).await;

    // Strictly ordered: unregister, THEN publish peer_disconnected, THEN
    // signal the write task to stop. This guarantees the departing peer
    // never observes its own disconnected broadcast (it is no longer a
    // subscriber when the control message is sent).
    broker.unregister(&room, &session);
    if let Some(disconnected) = message::peer_disconnected(&uid) {
        broker.send(&room, disconnected);
    } else {
        error!(room = %room, peer = %uid, "failed to marshal peer_disconnected control message");
    }
    let _ = stop_tx.send(());

    let _ = write_handle.await;
    metrics::counter!("tarpon_sessions_ended_total").increment(1);
    metrics::gauge!("tarpon_active_sessions").decrement(1.0);
    info!(room = %room, peer = %uid, "session ended");
}

async fn read_loop(
    mut stream: futures_util::stream::SplitStream<WebSocket>,
    broker: &Broker,
    room: &str,
    uid: &str,
    config: SessionConfig,
) {
    let mut deadline = tokio::time::Instant::now() + config.pong_wait;
    loop {
        let next = tokio::time::timeout_at(deadline, stream.next()).await;
        let frame = match next {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                error!(room = %room, peer = %uid, error = %e, "websocket read error");
                break;
            }
            Ok(None) => {
                info!(room = %room, peer = %uid, "peer disconnected");
                break;
            }
            Err(_elapsed) => {
                warn!(room = %room, peer = %uid, "no activity within pong window, closing");
                break;
            }
        };

        match frame {
            WsFrame::Text(text) => {
                if text.len() > config.max_message_size {
                    warn!(room = %room, peer = %uid, size = text.len(), "inbound frame exceeds max message size, dropping");
                    metrics::counter!("tarpon_messages_dropped_total", "reason" => "too_large").increment(1);
                    continue;
                }
                handle_client_text(&text, broker, room, uid);
            }
            WsFrame::Pong(_) => {
                // Only a Pong renews the liveness deadline: a peer that
                // streams data but never answers pings must still be reaped.
                deadline = tokio::time::Instant::now() + config.pong_wait;
                debug!(room = %room, peer = %uid, "pong received");
            }
            WsFrame::Ping(_) => {
                // axum answers pings with pongs automatically before the
                // frame reaches application code; nothing to do here.
            }
            WsFrame::Close(frame) => {
                log_close(room, uid, frame);
                break;
            }
            WsFrame::Binary(_) => {
                warn!(room = %room, peer = %uid, "unexpected binary frame, dropping");
            }
        }
    }
}

fn log_close(room: &str, uid: &str, frame: Option<axum::extract::ws::CloseFrame>) {
    let expected = matches!(
        frame.as_ref().map(|f| f.code),
        None | Some(1000) | Some(1001) | Some(1006)
    );
    if expected {
        info!(room = %room, peer = %uid, "peer closed connection");
    } else {
        error!(room = %room, peer = %uid, code = ?frame.map(|f| f.code), "peer closed with unexpected code");
    }
}

fn handle_client_text(text: &str, broker: &Broker, room: &str, uid: &str) {
    let req: ClientFrame = match serde_json::from_str(text) {
        Ok(req) => req,
        Err(e) => {
            debug!(room = %room, peer = %uid, error = %e, "dropping malformed inbound frame");
            metrics::counter!("tarpon_messages_dropped_total", "reason" => "decode_error").increment(1);
            return;
        }
    };
    if !req.has_valid_payload() {
        debug!(room = %room, peer = %uid, "dropping frame with missing or null payload");
        metrics::counter!("tarpon_messages_dropped_total", "reason" => "null_payload").increment(1);
        return;
    }
    // The sender's `from` is never trusted from the wire: the
    // authenticated identity always wins.
    let payload = req.payload.expect("checked by has_valid_payload");
    let kind = if req.to.is_empty() { "broadcast" } else { "unicast" };
    broker.send(
        room,
        Message { from: uid.to_owned(), to: req.to, payload },
    );
    metrics::counter!("tarpon_messages_routed_total", "kind" => kind).increment(1);
}

async fn write_loop(
    mut sink: futures_util::stream::SplitSink<WebSocket, WsFrame>,
    mut outbound_rx: mpsc::Receiver<Message>,
    mut stop_rx: oneshot::Receiver<()>,
    config: SessionConfig,
) {
    let mut ticker = tokio::time::interval(config.ping_period);
    ticker.tick().await; // first tick fires immediately; skip it.

    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                break;
            }
            maybe_msg = outbound_rx.recv() => {
                let Some(msg) = maybe_msg else { break };
                let Ok(json) = serde_json::to_string(&msg) else { continue };
                if send_with_deadline(&mut sink, WsFrame::Text(json), config.write_wait).await.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if send_with_deadline(&mut sink, WsFrame::Ping(Vec::new()), config.write_wait).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Err(e) = sink.close().await {
        debug!(error = %e, "error closing websocket sink (idempotent, ignored)");
    }
}

async fn send_with_deadline(
    sink: &mut futures_util::stream::SplitSink<WebSocket, WsFrame>,
    frame: WsFrame,
    write_wait: Duration,
) -> Result<(), ()> {
    match tokio::time::timeout(write_wait, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            warn!(error = %e, "websocket write error, closing session");
            Err(())
        }
        Err(_elapsed) => {
            warn!("websocket write deadline exceeded, closing session");
            Err(())
        }
    }
}
