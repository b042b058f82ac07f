use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::board::{Connection, GameItem, ItemRef, string_or_number};

/// Opaque fields of a game-control event, handed to the game layer as-is.
pub type ControlFields = Map<String, Value>;

/// A game event relayed through an `action` envelope, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Add { item: GameItem },
    Connect { from: ItemRef, to: ItemRef },
    Move {
        #[serde(deserialize_with = "string_or_number")]
        id: String,
        x: f64,
        y: f64,
    },
    StartGame(ControlFields),
    GameStarted(ControlFields),
    PvpResults(ControlFields),
    PvpComplete(ControlFields),
    EndGame(ControlFields),
}

impl Action {
    /// The wire name of this action's `kind`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Connect { .. } => "connect",
            Self::Move { .. } => "move",
            Self::StartGame(_) => "start_game",
            Self::GameStarted(_) => "game_started",
            Self::PvpResults(_) => "pvp_results",
            Self::PvpComplete(_) => "pvp_complete",
            Self::EndGame(_) => "end_game",
        }
    }

    /// The item a continuous action (drag-move) updates. A later continuous action for the
    /// same item supersedes this one.
    #[must_use]
    pub fn continuous_target(&self) -> Option<&str> {
        match self {
            Self::Move { id, .. } => Some(id.as_str()),
            _ => None,
        }
    }

    /// Build the connection a `connect` action describes.
    #[must_use]
    pub fn as_connection(&self) -> Option<Connection> {
        match self {
            Self::Connect { from, to } => Some(Connection {
                from: from.clone(),
                to: to.clone(),
                extra: Map::new(),
            }),
            _ => None,
        }
    }
}
