//! Local copy of the shared board and the dedup rules for relayed actions.

use crate::protocol::{Action, Connection, GameItem, GameSnapshot, ItemKey};

/// Result of folding one action into the local board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The board changed.
    Applied,
    /// An equivalent item or connection was already present.
    Duplicate,
    /// A `move` for an item this client has not seen yet; dropped.
    Missing,
    /// A game-control event; the board is untouched.
    Control,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalBoard {
    snapshot: GameSnapshot,
}

impl LocalBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn from_snapshot(snapshot: GameSnapshot) -> Self {
        Self { snapshot }
    }

    #[must_use]
    pub const fn snapshot(&self) -> &GameSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn items(&self) -> &[GameItem] {
        &self.snapshot.items
    }

    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.snapshot.connections
    }

    /// Replace the whole board (last snapshot wins).
    pub fn replace(&mut self, snapshot: GameSnapshot) {
        self.snapshot = snapshot;
    }

    #[must_use]
    pub fn contains_item(&self, key: &ItemKey) -> bool {
        self.snapshot.items.iter().any(|item| &item.key() == key)
    }

    #[must_use]
    pub fn contains_connection(&self, pair: &(ItemKey, ItemKey)) -> bool {
        self.snapshot
            .connections
            .iter()
            .any(|conn| &conn.pair_key() == pair)
    }

    /// Fold an action, relayed or local, into the board.
    pub fn apply(&mut self, action: &Action) -> ApplyOutcome {
        match action {
            Action::Add { item } => {
                if self.contains_item(&item.key()) {
                    return ApplyOutcome::Duplicate;
                }
                self.snapshot.items.push(item.clone());
                ApplyOutcome::Applied
            }
            Action::Connect { .. } => {
                let Some(connection) = action.as_connection() else {
                    return ApplyOutcome::Control;
                };
                if self.contains_connection(&connection.pair_key()) {
                    return ApplyOutcome::Duplicate;
                }
                self.snapshot.connections.push(connection);
                ApplyOutcome::Applied
            }
            Action::Move { id, x, y } => {
                match self.snapshot.items.iter_mut().find(|item| &item.id == id) {
                    Some(item) => {
                        item.x = *x;
                        item.y = *y;
                        ApplyOutcome::Applied
                    }
                    None => ApplyOutcome::Missing,
                }
            }
            Action::StartGame(_)
            | Action::GameStarted(_)
            | Action::PvpResults(_)
            | Action::PvpComplete(_)
            | Action::EndGame(_) => ApplyOutcome::Control,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::protocol::{ControlFields, ItemRef};

    fn item(id: &str, external_id: &str, media_type: &str) -> GameItem {
        GameItem {
            id: id.to_string(),
            external_id: external_id.to_string(),
            media_type: media_type.to_string(),
            x: 0.0,
            y: 0.0,
            extra: Map::new(),
        }
    }

    fn end(external_id: &str, media_type: &str) -> ItemRef {
        ItemRef {
            id: None,
            external_id: external_id.to_string(),
            media_type: media_type.to_string(),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_add_dedups_by_content_key() {
        let mut board = LocalBoard::new();
        let first = Action::Add {
            item: item("local-1", "603", "movie"),
        };
        // Same movie added by another client under a different transport id
        let second = Action::Add {
            item: item("remote-9", " 603 ", "Movie"),
        };

        assert_eq!(board.apply(&first), ApplyOutcome::Applied);
        assert_eq!(board.apply(&second), ApplyOutcome::Duplicate);
        assert_eq!(board.items().len(), 1);

        // Same external id, different media type is a different item
        let person = Action::Add {
            item: item("p-1", "603", "person"),
        };
        assert_eq!(board.apply(&person), ApplyOutcome::Applied);
        assert_eq!(board.items().len(), 2);
    }

    #[test]
    fn test_connect_dedups_unordered_pairs() {
        let mut board = LocalBoard::new();
        let xy = Action::Connect {
            from: end("1", "movie"),
            to: end("2", "person"),
        };
        let yx = Action::Connect {
            from: end("2", "person"),
            to: end("1", "movie"),
        };

        assert_eq!(board.apply(&xy), ApplyOutcome::Applied);
        assert_eq!(board.apply(&yx), ApplyOutcome::Duplicate);
        assert_eq!(board.connections().len(), 1);
    }

    #[test]
    fn test_move_updates_known_item_and_drops_unknown() {
        let mut board = LocalBoard::from_snapshot(GameSnapshot {
            items: vec![item("x", "1", "movie")],
            ..GameSnapshot::default()
        });

        let known = Action::Move {
            id: "x".to_string(),
            x: 10.0,
            y: 20.0,
        };
        assert_eq!(board.apply(&known), ApplyOutcome::Applied);
        assert!((board.items()[0].x - 10.0).abs() < f64::EPSILON);
        assert!((board.items()[0].y - 20.0).abs() < f64::EPSILON);

        let unknown = Action::Move {
            id: "not-synced".to_string(),
            x: 1.0,
            y: 1.0,
        };
        let before = board.clone();
        assert_eq!(board.apply(&unknown), ApplyOutcome::Missing);
        assert_eq!(board, before);
    }

    #[test]
    fn test_control_events_leave_board_alone() {
        let mut board = LocalBoard::new();
        let before = board.clone();
        assert_eq!(
            board.apply(&Action::StartGame(ControlFields::new())),
            ApplyOutcome::Control
        );
        assert_eq!(board, before);
    }
}
