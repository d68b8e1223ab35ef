//! Room user directory
//!
//! Maps the transient per-room session index carried by chat packets to a
//! display name.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::presence::{Position, PresenceSource};

/// Name used when a sender index is not in the directory
pub const UNKNOWN_USER: &str = "Unknown";

/// Entity type of a human player in the room user list
pub const HUMAN_ENTITY: i32 = 1;

/// A user entry from the room's user list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUser {
    /// Session index within the room
    pub index: i32,
    pub name: String,
    #[serde(default)]
    pub figure: String,
    #[serde(default)]
    pub gender: String,
    /// Motto
    #[serde(default)]
    pub custom: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub pool_figure: String,
    #[serde(default)]
    pub badge_code: String,
    /// Entity type; only [`HUMAN_ENTITY`] entries are tracked
    #[serde(default = "default_entity")]
    pub entity_type: i32,
}

fn default_entity() -> i32 {
    HUMAN_ENTITY
}

impl RoomUser {
    pub fn new(index: i32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            figure: String::new(),
            gender: String::new(),
            custom: String::new(),
            x: 0,
            y: 0,
            z: 0.0,
            pool_figure: String::new(),
            badge_code: String::new(),
            entity_type: HUMAN_ENTITY,
        }
    }

    pub fn is_human(&self) -> bool {
        self.entity_type == HUMAN_ENTITY
    }
}

/// Identity lookup used by the ingestion path
pub trait UserDirectory: Send + Sync {
    /// Display name for a session index, if known
    fn lookup(&self, index: i32) -> Option<String>;

    /// Display name or [`UNKNOWN_USER`]
    fn display_name(&self, index: i32) -> String {
        self.lookup(index)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string())
    }
}

/// In-memory directory fed from room user lists
#[derive(Debug, Default)]
pub struct RoomDirectory {
    users: RwLock<HashMap<i32, RoomUser>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace users; non-human entities are skipped. Returns how many were stored.
    pub fn upsert(&self, users: impl IntoIterator<Item = RoomUser>) -> usize {
        let mut map = self.users.write();
        let mut stored = 0;
        for user in users.into_iter().filter(RoomUser::is_human) {
            map.insert(user.index, user);
            stored += 1;
        }
        stored
    }

    /// Remove a departed user
    pub fn remove(&self, index: i32) -> Option<RoomUser> {
        self.users.write().remove(&index)
    }

    /// Forget everyone (room change)
    pub fn clear(&self) {
        self.users.write().clear();
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl UserDirectory for RoomDirectory {
    fn lookup(&self, index: i32) -> Option<String> {
        self.users.read().get(&index).map(|u| u.name.clone())
    }
}

impl PresenceSource for RoomDirectory {
    fn entities(&self) -> Vec<(String, Position)> {
        self.users
            .read()
            .values()
            .map(|u| (u.name.clone(), Position { x: u.x, y: u.y }))
            .collect()
    }
}
