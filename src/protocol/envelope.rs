use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::Action;
use super::board::GameSnapshot;

/// The closed set of envelope types on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    State,
    Action,
    Presence,
    Roster,
}

impl MessageType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Action => "action",
            Self::Presence => "presence",
            Self::Roster => "roster",
        }
    }

    /// `presence` and `roster` may only originate from the relay itself.
    #[must_use]
    pub const fn is_server_originated(self) -> bool {
        match self {
            Self::State | Self::Action => false,
            Self::Presence | Self::Roster => true,
        }
    }
}

/// Payload of a `presence` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub count: usize,
}

/// One member of a room as published in a `roster` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: String,
    pub is_host: bool,
    pub joined_at: DateTime<Utc>,
}

/// A fully typed `{type, payload}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Envelope {
    State(GameSnapshot),
    Action(Action),
    Presence(Presence),
    Roster(Vec<RosterEntry>),
}

impl Envelope {
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::State(_) => MessageType::State,
            Self::Action(_) => MessageType::Action,
            Self::Presence(_) => MessageType::Presence,
            Self::Roster(_) => MessageType::Roster,
        }
    }

    /// Serialize to the JSON text frame sent over the socket.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload holds a value JSON cannot represent (e.g. a NaN coordinate).
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error for unparseable JSON, an unknown `type`, or a payload of the wrong shape.
    pub fn from_text(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Just the `type` of an envelope; the payload is never inspected by the relay.
#[derive(Debug, Deserialize)]
pub struct EnvelopeHeader {
    #[serde(rename = "type")]
    pub message_type: MessageType,
}

/// What the relay does with an inbound client frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Forward the original text verbatim to every other room member.
    Relay(MessageType),
    /// Drop: the client tried to speak for the server.
    Reject(MessageType),
}

/// Classify an inbound client frame by its `type` alone.
///
/// # Errors
///
/// Returns an error for unparseable JSON or an unknown `type`.
pub fn route_inbound(text: &str) -> serde_json::Result<Route> {
    let header: EnvelopeHeader = serde_json::from_str(text)?;
    let message_type = header.message_type;
    Ok(if message_type.is_server_originated() {
        Route::Reject(message_type)
    } else {
        Route::Relay(message_type)
    })
}
