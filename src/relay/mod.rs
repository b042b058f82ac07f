//! In-memory room relay.
//!
//! Clients in the same room share `state` and `action` frames; the relay never looks at
//! payloads. Membership changes publish a `roster` and a `presence` frame to the room.

mod presence;
mod registry;
mod router;
mod session;

use tokio::sync::mpsc;

use crate::protocol::{Route, route_inbound};

pub use presence::{host, roster};
pub use registry::{Departure, Room, RoomRegistry};
pub use router::BroadcastReport;
pub use session::{
    DEFAULT_ROOM, DeliveryError, SessionHandle, SessionId, WsTx, resolve_client_id, resolve_room,
};

/// Composition of the room registry, broadcast router and presence tracker.
#[derive(Debug, Clone)]
pub struct Relay {
    registry: RoomRegistry,
    outbound_buffer: usize,
}

impl Relay {
    /// Create a relay whose sessions buffer up to `outbound_buffer` frames each.
    #[must_use]
    pub fn new(outbound_buffer: usize) -> Self {
        Self {
            registry: RoomRegistry::new(),
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Open a session for `client_id` and admit it to `room`.
    ///
    /// Returns the session and the receiving end of its outbound queue, which already holds
    /// the room's roster and presence frames.
    pub fn connect(&self, room: &str, client_id: &str) -> (SessionHandle, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.outbound_buffer);
        let mut session = SessionHandle::new(client_id, tx);
        let session_id = session.id();

        self.registry.join(room, &mut session, |room| {
            tracing::info!(
                room = room.id(),
                client_id,
                session_id = %session_id,
                members = room.len(),
                "Client joined"
            );
            presence::announce(room);
        });

        (session, rx)
    }

    /// Evict `session`; remaining members get a fresh roster. Safe to call more than once.
    pub fn disconnect(&self, session: &SessionHandle) -> Departure {
        let departure = self.registry.leave(session, |room| {
            tracing::info!(
                room = room.id(),
                client_id = session.client_id(),
                session_id = %session.id(),
                members = room.len(),
                "Client left"
            );
            presence::announce(room);
        });

        match &departure {
            Departure::Left { .. } => {
                if departure.handed_off_host(session.id()) {
                    let new_host = self
                        .registry
                        .with_room(session.room(), |room| host(room).map(str::to_string))
                        .flatten();
                    tracing::info!(
                        room = session.room(),
                        previous_host = session.client_id(),
                        new_host = new_host.as_deref().unwrap_or_default(),
                        "Host reassigned"
                    );
                }
            }
            Departure::RoomClosed => {
                tracing::info!(
                    room = session.room(),
                    client_id = session.client_id(),
                    "Client left; room closed"
                );
            }
            Departure::Unknown => {
                tracing::debug!(
                    session_id = %session.id(),
                    "Disconnect for a session that is not registered"
                );
            }
        }

        departure
    }

    /// Fan `text` out to `room`, skipping `exclude`.
    pub fn broadcast(
        &self,
        room: &str,
        text: &str,
        exclude: Option<SessionId>,
    ) -> BroadcastReport {
        self.registry
            .with_room(room, |room| router::broadcast(room.members(), text, exclude))
            .unwrap_or_default()
    }

    /// Dispatch one client frame: relay `state`/`action` to peers, drop anything else.
    ///
    /// Returns the delivery report when the frame was relayed.
    pub fn handle_inbound(&self, session: &SessionHandle, text: &str) -> Option<BroadcastReport> {
        session.touch();

        match route_inbound(text) {
            Ok(Route::Relay(_)) => Some(self.broadcast(session.room(), text, Some(session.id()))),
            Ok(Route::Reject(message_type)) => {
                tracing::debug!(
                    room = session.room(),
                    client_id = session.client_id(),
                    message_type = message_type.as_str(),
                    "Ignoring server-only frame sent by client"
                );
                None
            }
            Err(err) => {
                tracing::debug!(
                    room = session.room(),
                    client_id = session.client_id(),
                    "Dropping malformed frame: {err}"
                );
                None
            }
        }
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.registry.room_count()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.registry.session_count()
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(256)
    }
}
