//! Room bookkeeping: which sessions are in which room, in join order.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::session::{SessionHandle, SessionId};

/// Live members of one room, ordered by tenure (earliest joiner first).
#[derive(Debug, Default)]
pub struct Room {
    id: String,
    members: Vec<SessionHandle>,
}

impl Room {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn members(&self) -> &[SessionHandle] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn contains(&self, session_id: SessionId) -> bool {
        self.members.iter().any(|m| m.id() == session_id)
    }
}

/// Outcome of a [`RoomRegistry::leave`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The session was not registered; nothing changed.
    Unknown,
    /// The session left and others remain. `previous_host` is the host session before
    /// the leave.
    Left { previous_host: Option<SessionId> },
    /// The session was the last member; the room is gone.
    RoomClosed,
}

impl Departure {
    /// Whether `leaving` was the host, so hosting passed to the next-longest member.
    #[must_use]
    pub fn handed_off_host(&self, leaving: SessionId) -> bool {
        matches!(self, Self::Left { previous_host: Some(host) } if *host == leaving)
    }
}

/// Maps room codes to their live sessions.
///
/// A room exists exactly while it has at least one member. Every mutation runs under the
/// room's map-entry lock, and the `on_change` callbacks run inside that same critical
/// section, so observers see membership changes of one room in a single total order.
#[derive(Debug, Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<String, Room>>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
        }
    }

    /// Admit `session` to `room`, creating the room on first join.
    ///
    /// Joining twice with the same session is a no-op and returns `false`. On a real join
    /// `on_change` sees the updated room before the lock is released.
    pub fn join(
        &self,
        room: &str,
        session: &mut SessionHandle,
        on_change: impl FnOnce(&Room),
    ) -> bool {
        let mut entry = self
            .rooms
            .entry(room.to_string())
            .or_insert_with(|| Room::new(room));

        if entry.contains(session.id()) {
            return false;
        }

        session.assign_room(room, Utc::now());
        entry.members.push(session.clone());
        on_change(&entry);
        true
    }

    /// Remove `session` from its room, deleting the room when it empties.
    ///
    /// Unknown sessions and rooms are tolerated. `on_change` runs only if members remain.
    pub fn leave(&self, session: &SessionHandle, on_change: impl FnOnce(&Room)) -> Departure {
        let Entry::Occupied(mut entry) = self.rooms.entry(session.room().to_string()) else {
            return Departure::Unknown;
        };

        let room = entry.get_mut();
        let Some(pos) = room.members.iter().position(|m| m.id() == session.id()) else {
            return Departure::Unknown;
        };

        let previous_host = room.members.first().map(SessionHandle::id);
        room.members.remove(pos);

        if room.is_empty() {
            entry.remove();
            return Departure::RoomClosed;
        }

        on_change(entry.get());
        Departure::Left { previous_host }
    }

    /// Snapshot of the sessions currently in `room`, in tenure order.
    #[must_use]
    pub fn members_of(&self, room: &str) -> Vec<SessionHandle> {
        self.rooms
            .get(room)
            .map(|r| r.members.clone())
            .unwrap_or_default()
    }

    /// Run `f` against `room` while holding its lock.
    pub fn with_room<T>(&self, room: &str, f: impl FnOnce(&Room) -> T) -> Option<T> {
        self.rooms.get(room).map(|r| f(&r))
    }

    #[must_use]
    pub fn contains_room(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.rooms.iter().map(|r| r.len()).sum()
    }
}
