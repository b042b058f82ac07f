//! Roster and host derivation, published on every membership change.

use crate::protocol::{Envelope, Presence, RosterEntry};

use super::registry::Room;
use super::router;

/// The host is the longest-tenured member still connected.
#[must_use]
pub fn host(room: &Room) -> Option<&str> {
    room.members().first().map(super::SessionHandle::client_id)
}

/// Ordered roster of `room`, earliest joiner first.
#[must_use]
pub fn roster(room: &Room) -> Vec<RosterEntry> {
    room.members()
        .iter()
        .enumerate()
        .map(|(idx, member)| RosterEntry {
            id: member.client_id().to_string(),
            is_host: idx == 0,
            joined_at: member.joined_at(),
        })
        .collect()
}

/// Send the current roster, then the member count, to everyone in `room`.
///
/// Called with the room lock held so no member can observe a later change first.
pub fn announce(room: &Room) {
    let frames = [
        Envelope::Roster(roster(room)),
        Envelope::Presence(Presence { count: room.len() }),
    ];

    for envelope in frames {
        match envelope.to_text() {
            Ok(text) => {
                router::broadcast(room.members(), &text, None);
            }
            Err(err) => {
                tracing::error!(
                    room = room.id(),
                    message_type = envelope.message_type().as_str(),
                    "Failed to encode server frame: {err}"
                );
            }
        }
    }
}
