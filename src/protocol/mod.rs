//! Wire protocol shared by the relay and its clients.
//!
//! Every frame is a JSON text message `{"type": ..., "payload": ...}`. The relay reads
//! only `type` ([`route_inbound`]); clients parse the full [`Envelope`].

mod action;
mod board;
mod envelope;

pub use action::{Action, ControlFields};
pub use board::{Connection, GameItem, GameSnapshot, ItemKey, ItemRef};
pub use envelope::{
    Envelope, EnvelopeHeader, MessageType, Presence, Route, RosterEntry, route_inbound,
};
