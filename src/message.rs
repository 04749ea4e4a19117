//! The message envelope that flows through the broker, and the control
//! payloads the server synthesizes around peer connect/disconnect.

use serde::{Deserialize, Serialize};

/// Reserved sender identity used for server-originated control messages.
pub const SERVER_UID: &str = "tarpon";

/// Envelope carried between peers in a room. `payload` is preserved
/// byte-for-byte: the broker and session never interpret it beyond
/// checking it is present and non-null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub payload: serde_json::Value,
}

impl Message {
    /// `to == ""` denotes a broadcast to every subscriber of the room.
    pub fn is_broadcast(&self) -> bool {
        self.to.is_empty()
    }
}

/// Inbound frame shape a peer sends on the wire. `from`, if present, is
/// always ignored: the authenticated identity wins.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    pub to: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

impl ClientFrame {
    /// `payload` must be present and non-null for the frame to be routable.
    pub fn has_valid_payload(&self) -> bool {
        !matches!(self.payload, None | Some(serde_json::Value::Null))
    }
}

/// The two control-message kinds the server ever emits on behalf of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    PeerConnected,
    PeerDisconnected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPayload {
    #[serde(rename = "type")]
    pub kind: ControlKind,
    pub peer: String,
}

/// Builds the `Message` wrapping a `peer_connected`/`peer_disconnected`
/// control payload, addressed to the whole room (`to = ""`, `from =
/// "tarpon"`). Returns `None` only if serialization of the control payload
/// itself fails; callers treat that as a logged, non-fatal event.
pub fn control_message(kind: ControlKind, peer_uid: &str) -> Option<Message> {
    let payload = serde_json::to_value(ControlPayload {
        kind,
        peer: peer_uid.to_owned(),
    })
    .ok()?;
    Some(Message {
        from: SERVER_UID.to_owned(),
        to: String::new(),
        payload,
    })
}

pub fn peer_connected(peer_uid: &str) -> Option<Message> {
    control_message(ControlKind::PeerConnected, peer_uid)
}

pub fn peer_disconnected(peer_uid: &str) -> Option<Message> {
    control_message(ControlKind::PeerDisconnected, peer_uid)
}
