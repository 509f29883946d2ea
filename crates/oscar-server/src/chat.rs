//! Chat rooms and service hand-off bookkeeping.
//!
//! Rooms are created through chat-nav and joined by redeeming a single-use
//! hand-off cookie at the chat endpoint. Each room owns a private
//! [`SessionManager`] for its roster, so broadcast and exclusion reuse the
//! same primitives as the BOS service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use uuid::Uuid;

use crate::session::SessionManager;
use oscar_proto::snacs::chat::{ROOM_TLV_NAME, RoomInfo};
use oscar_proto::tlv::{Tlv, TlvBlock};

/// A single-use credential minted by a service-request hand-off and
/// redeemed by the connection that presents it.
#[derive(Debug, Clone)]
pub enum Handoff {
    /// Chat-nav connection for a signed-on user.
    Nav {
        /// Who is connecting
        screen_name: String,
    },
    /// Chat connection joining one room.
    Room {
        /// Who is connecting
        screen_name: String,
        /// Cookie of the room to join
        room_cookie: String,
    },
}

/// One chat room: identity plus its member roster.
pub struct ChatRoom {
    /// Room cookie, stable for the room's lifetime
    pub cookie: String,
    /// Display name
    pub name: String,
    /// Exchange the room was created on
    pub exchange: u16,
    /// Member sessions, keyed by their chat-connection cookies
    pub sessions: SessionManager,
}

impl ChatRoom {
    /// Room description sent to joining members and in chat-nav replies.
    pub fn room_info(&self) -> RoomInfo {
        RoomInfo {
            exchange: self.exchange,
            cookie: self.cookie.clone(),
            instance: 0,
            detail_level: 2,
            tlvs: TlvBlock::from(vec![Tlv::new_string(ROOM_TLV_NAME, &self.name)]),
        }
    }
}

/// Process-wide registry of rooms and outstanding hand-offs.
#[derive(Default)]
pub struct ChatRegistry {
    rooms: RwLock<HashMap<String, Arc<ChatRoom>>>,
    handoffs: Mutex<HashMap<String, Handoff>>,
}

impl ChatRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::expect_used)]
    fn rooms_read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<ChatRoom>>> {
        self.rooms.read().expect("room map lock poisoned")
    }

    /// Creates a room, or returns the existing one with the same name on
    /// the same exchange so that two clients "creating" a room meet in it.
    pub fn create_room(&self, name: &str, exchange: u16) -> Arc<ChatRoom> {
        #[allow(clippy::expect_used)]
        let mut rooms = self.rooms.write().expect("room map lock poisoned");
        if let Some(existing) =
            rooms.values().find(|r| r.name == name && r.exchange == exchange)
        {
            return Arc::clone(existing);
        }
        let cookie = Uuid::new_v4().to_string();
        let room = Arc::new(ChatRoom {
            cookie: cookie.clone(),
            name: name.to_string(),
            exchange,
            sessions: SessionManager::new(),
        });
        tracing::info!(room = %name, %cookie, exchange, "chat room created");
        rooms.insert(cookie, Arc::clone(&room));
        room
    }

    /// Room by cookie.
    pub fn room(&self, cookie: &str) -> Option<Arc<ChatRoom>> {
        self.rooms_read().get(cookie).cloned()
    }

    #[allow(clippy::expect_used)]
    fn insert_handoff(&self, handoff: Handoff) -> String {
        let cookie = Uuid::new_v4().to_string();
        self.handoffs.lock().expect("handoff lock poisoned").insert(cookie.clone(), handoff);
        cookie
    }

    /// Mints a hand-off cookie for a chat-nav connection.
    pub fn begin_nav_handoff(&self, screen_name: String) -> String {
        self.insert_handoff(Handoff::Nav { screen_name })
    }

    /// Mints a hand-off cookie for joining `room_cookie`.
    pub fn begin_room_handoff(&self, screen_name: String, room_cookie: String) -> String {
        self.insert_handoff(Handoff::Room { screen_name, room_cookie })
    }

    /// Redeems a hand-off cookie. Single use: the entry is removed.
    pub fn take_handoff(&self, cookie: &str) -> Option<Handoff> {
        #[allow(clippy::expect_used)]
        self.handoffs.lock().expect("handoff lock poisoned").remove(cookie)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatRegistry, Handoff};

    #[test]
    fn create_room_dedupes_by_name_and_exchange() {
        let registry = ChatRegistry::new();
        let a = registry.create_room("lobby", 4);
        let b = registry.create_room("lobby", 4);
        assert_eq!(a.cookie, b.cookie);

        let c = registry.create_room("lobby", 5);
        assert_ne!(a.cookie, c.cookie);
    }

    #[test]
    fn handoff_is_single_use() {
        let registry = ChatRegistry::new();
        let room = registry.create_room("lobby", 4);
        let cookie = registry.begin_room_handoff("alice".to_string(), room.cookie.clone());

        match registry.take_handoff(&cookie) {
            Some(Handoff::Room { screen_name, room_cookie }) => {
                assert_eq!(screen_name, "alice");
                assert_eq!(room_cookie, room.cookie);
            }
            other => panic!("unexpected handoff: {other:?}"),
        }
        assert!(registry.take_handoff(&cookie).is_none());
    }
}
