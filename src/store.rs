//! The room/peer catalog, kept behind a trait so the join handler and admin
//! HTTP surface only ever depend on an interface; an in-memory
//! implementation is provided so the server is runnable end to end.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

/// `(uid, secret)` pair. `uid` is the public identifier used in
/// `Message::from`/`Message::to`; `secret` authenticates the peer at join
/// time and is never exposed to other peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub uid: String,
    pub secret: String,
}

/// Errors `join_room` can return; translated 1:1 to HTTP statuses by the
/// join handler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("room not found")]
    RoomNotFound,
    #[error("unauthorized")]
    Unauthorized,
}

/// Consumed contract between the core and the room/peer catalog.
/// Implementations must be safe under concurrent invocation.
pub trait RoomStore: Send + Sync {
    /// Creates `uid` as a room. Returns `true` iff it was newly created.
    fn create_room(&self, uid: &str) -> bool;

    /// Registers `peer` in `room`, auto-creating the room if absent. Returns
    /// `true` iff newly registered, `false` iff an existing binding for that
    /// `uid` was updated.
    fn register_peer(&self, room: &str, peer: Peer) -> bool;

    /// Resolves `secret` to a peer within `room`.
    fn join_room(&self, room: &str, secret: &str) -> Result<Peer, JoinError>;
}

#[derive(Default)]
struct RoomEntry {
    peers: Vec<Peer>,
}

impl RoomEntry {
    fn register(&mut self, peer: Peer) -> bool {
        if let Some(existing) = self.peers.iter_mut().find(|p| p.uid == peer.uid) {
            *existing = peer;
            false
        } else {
            self.peers.push(peer);
            true
        }
    }

    fn find_by_secret(&self, secret: &str) -> Option<Peer> {
        self.peers.iter().find(|p| p.secret == secret).cloned()
    }
}

/// In-memory `RoomStore`. The only production-adjacent implementation
/// provided; a real deployment would swap in a database-backed store
/// without the core caring.
#[derive(Default)]
pub struct InMemoryRoomStore {
    rooms: RwLock<HashMap<String, RoomEntry>>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for InMemoryRoomStore {
    fn create_room(&self, uid: &str) -> bool {
        let mut rooms = self.rooms.write().expect("store lock poisoned");
        if rooms.contains_key(uid) {
            false
        } else {
            rooms.insert(uid.to_owned(), RoomEntry::default());
            true
        }
    }

    fn register_peer(&self, room: &str, peer: Peer) -> bool {
        let mut rooms = self.rooms.write().expect("store lock poisoned");
        rooms.entry(room.to_owned()).or_default().register(peer)
    }

    fn join_room(&self, room: &str, secret: &str) -> Result<Peer, JoinError> {
        let rooms = self.rooms.read().expect("store lock poisoned");
        let entry = rooms.get(room).ok_or(JoinError::RoomNotFound)?;
        entry.find_by_secret(secret).ok_or(JoinError::Unauthorized)
    }
}
