//! Room-scoped fan-out broker: a mapping from room identifier to a list of
//! subscribers, guarded by a single reader/writer lock.
//!
//! Dispatch never awaits while holding the lock, so a synchronous
//! `std::sync::RwLock` is the right primitive here rather than an async one.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::message::Message;

/// Capability the broker uses to reach a live session. In production the
/// only implementor is [`crate::session::Session`]; the broker never holds
/// anything but this capability, so a subscriber's transport and task
/// internals are invisible to it.
pub trait Subscriber: Send + Sync {
    /// The peer identifier this subscriber was registered under.
    fn id(&self) -> &str;

    /// Non-blocking delivery attempt. Implementations must never block the
    /// caller (the broker's dispatch path) for any reason; on back-pressure
    /// they drop and log instead.
    fn enqueue(&self, message: Message);
}

type SubscriberList = Vec<Arc<dyn Subscriber>>;

/// In-memory room → subscribers registry and router.
#[derive(Default)]
pub struct Broker {
    rooms: RwLock<HashMap<String, SubscriberList>>,
}

impl Broker {
    pub fn new() -> Self {
        Self { rooms: RwLock::new(HashMap::new()) }
    }

    /// Appends `sub` to `room`'s subscriber list, creating the list if this
    /// is the first registration. No deduplication: registering the same
    /// subscriber twice delivers every subsequent message to it twice.
    pub fn register(&self, room: &str, sub: Arc<dyn Subscriber>) {
        let mut rooms = self.rooms.write().expect("broker lock poisoned");
        rooms.entry(room.to_owned()).or_default().push(sub);
    }

    /// Removes the first entry identity-equal to `sub` from `room` via
    /// swap-remove (remaining order is not contractual). Deletes the room
    /// entry entirely once its subscriber list is empty, so empty rooms
    /// never linger in the mapping. Returns `true` iff an entry was
    /// removed; unregistering an absent subscriber, or from a room that
    /// doesn't exist, returns `false` and is not an error.
    pub fn unregister(&self, room: &str, sub: &Arc<dyn Subscriber>) -> bool {
        let mut rooms = self.rooms.write().expect("broker lock poisoned");
        let Some(subs) = rooms.get_mut(room) else {
            return false;
        };
        let Some(index) = subs.iter().position(|existing| Arc::ptr_eq(existing, sub)) else {
            return false;
        };
        subs.swap_remove(index);
        if subs.is_empty() {
            rooms.remove(room);
        }
        true
    }

    /// Dispatches `message` to `room`'s subscribers under a shared (reader)
    /// lock, so many publishers may dispatch concurrently. Broadcast
    /// (`to == ""`) reaches every subscriber; unicast reaches every
    /// subscriber whose `id()` equals `message.to` (multiple matches all
    /// receive it). Sends to an unknown room are silently dropped. Never
    /// fails: a slow or full subscriber is that subscriber's problem alone.
    pub fn send(&self, room: &str, message: Message) {
        let rooms = self.rooms.read().expect("broker lock poisoned");
        let Some(subs) = rooms.get(room) else {
            return;
        };
        if message.is_broadcast() {
            for sub in subs {
                sub.enqueue(message.clone());
            }
        } else {
            for sub in subs.iter().filter(|sub| sub.id() == message.to) {
                sub.enqueue(message.clone());
            }
        }
    }

    /// Number of subscribers currently registered in `room` (0 if the room
    /// is absent). Test/diagnostic helper only.
    pub fn subscriber_count(&self, room: &str) -> usize {
        self.rooms
            .read()
            .expect("broker lock poisoned")
            .get(room)
            .map_or(0, Vec::len)
    }

    /// Whether `room` has any entry in the mapping at all. Used to assert
    /// the empty-room GC invariant.
    pub fn has_room(&self, room: &str) -> bool {
        self.rooms.read().expect("broker lock poisoned").contains_key(room)
    }
}
