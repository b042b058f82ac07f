use crate::protocol::{Action, Envelope, GameSnapshot, Presence, RosterEntry};

use super::board::{ApplyOutcome, LocalBoard};
use super::frame::FrameCoalescer;

/// Callbacks into the game layer. Every method defaults to a no-op.
pub trait GameHandlers: Send {
    /// A new board was applied (at most once per rendering tick).
    fn on_state(&mut self, _snapshot: &GameSnapshot) {}

    /// A relayed action changed the board, or is a game-control event.
    fn on_action(&mut self, _action: &Action) {}

    fn on_presence(&mut self, _presence: Presence) {}

    fn on_roster(&mut self, _roster: &[RosterEntry]) {}
}

impl GameHandlers for () {}

/// Folds inbound envelopes into a [`LocalBoard`] and reports changes to the game layer.
#[derive(Debug, Default)]
pub struct Reconciler<H> {
    board: LocalBoard,
    frames: FrameCoalescer<GameSnapshot>,
    handlers: H,
}

impl<H: GameHandlers> Reconciler<H> {
    pub fn new(handlers: H) -> Self {
        Self {
            board: LocalBoard::new(),
            frames: FrameCoalescer::new(),
            handlers,
        }
    }

    #[must_use]
    pub const fn board(&self) -> &LocalBoard {
        &self.board
    }

    #[must_use]
    pub const fn handlers(&self) -> &H {
        &self.handlers
    }

    /// Whether a snapshot is waiting for the next tick.
    #[must_use]
    pub const fn frame_pending(&self) -> bool {
        self.frames.is_pending()
    }

    /// Handle one raw text frame. Malformed frames are logged and dropped.
    pub fn receive_text(&mut self, text: &str) {
        match Envelope::from_text(text) {
            Ok(envelope) => self.receive(envelope),
            Err(err) => tracing::debug!("Dropping malformed relay frame: {err}"),
        }
    }

    pub fn receive(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::State(snapshot) => {
                self.frames.offer(snapshot);
            }
            Envelope::Action(action) => match self.board.apply(&action) {
                ApplyOutcome::Applied | ApplyOutcome::Control => self.handlers.on_action(&action),
                ApplyOutcome::Duplicate => {
                    tracing::trace!(kind = action.kind(), "Skipping duplicate action");
                }
                ApplyOutcome::Missing => {
                    tracing::trace!(kind = action.kind(), "Skipping action for unknown item");
                }
            },
            Envelope::Presence(presence) => self.handlers.on_presence(presence),
            Envelope::Roster(roster) => self.handlers.on_roster(&roster),
        }
    }

    /// Fold an envelope this client is sending into its own board, so relayed actions from
    /// peers are reconciled against it. The game layer already knows about its own
    /// changes, so nothing is reported to the handlers.
    ///
    /// A local `state` supersedes any remote snapshot still waiting for a tick.
    pub fn apply_local(&mut self, envelope: &Envelope) -> Option<ApplyOutcome> {
        match envelope {
            Envelope::Action(action) => Some(self.board.apply(action)),
            Envelope::State(snapshot) => {
                let _ = self.frames.take();
                self.board.replace(snapshot.clone());
                None
            }
            Envelope::Presence(_) | Envelope::Roster(_) => None,
        }
    }

    /// Rendering tick: apply the latest pending snapshot, if any. Returns whether one was applied.
    pub fn on_frame(&mut self) -> bool {
        let Some(snapshot) = self.frames.take() else {
            return false;
        };
        self.board.replace(snapshot);
        self.handlers.on_state(self.board.snapshot());
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        states: usize,
        actions: Vec<String>,
        presence: Vec<usize>,
        rosters: Vec<usize>,
    }

    impl GameHandlers for Recorder {
        fn on_state(&mut self, _snapshot: &GameSnapshot) {
            self.states += 1;
        }

        fn on_action(&mut self, action: &Action) {
            self.actions.push(action.kind().to_string());
        }

        fn on_presence(&mut self, presence: Presence) {
            self.presence.push(presence.count);
        }

        fn on_roster(&mut self, roster: &[RosterEntry]) {
            self.rosters.push(roster.len());
        }
    }

    fn state_frame(item_ids: &[&str]) -> String {
        let items: Vec<_> = item_ids
            .iter()
            .map(|id| json!({ "id": id, "externalId": id, "mediaType": "movie", "x": 0, "y": 0 }))
            .collect();
        json!({ "type": "state", "payload": { "items": items, "connections": [], "gameOptions": {} } })
            .to_string()
    }

    #[test]
    fn test_state_burst_applies_once_per_frame() {
        let mut reconciler = Reconciler::new(Recorder::default());
        reconciler.receive_text(&state_frame(&["a"]));
        reconciler.receive_text(&state_frame(&["a", "b"]));
        reconciler.receive_text(&state_frame(&["a", "b", "c"]));
        assert_eq!(reconciler.handlers().states, 0);

        assert!(reconciler.on_frame());
        assert!(!reconciler.on_frame());
        assert_eq!(reconciler.handlers().states, 1);
        assert_eq!(reconciler.board().items().len(), 3);
    }

    #[test]
    fn test_duplicate_add_not_forwarded() {
        let mut reconciler = Reconciler::new(Recorder::default());
        let add = |id: &str| {
            json!({
                "type": "action",
                "payload": {
                    "kind": "add",
                    "item": { "id": id, "tmdbId": 27205, "mediaType": "movie" }
                }
            })
            .to_string()
        };

        reconciler.receive_text(&add("one"));
        reconciler.receive_text(&add("two"));
        assert_eq!(reconciler.board().items().len(), 1);
        assert_eq!(reconciler.handlers().actions, ["add"]);
    }

    #[test]
    fn test_own_add_is_known_to_relayed_actions() {
        let mut reconciler = Reconciler::new(Recorder::default());
        let own: Envelope = serde_json::from_value(json!({
            "type": "action",
            "payload": { "kind": "add", "item": { "id": "x", "externalId": 603, "mediaType": "movie" } }
        }))
        .unwrap_or(Envelope::Presence(Presence { count: 0 }));

        assert_eq!(reconciler.apply_local(&own), Some(ApplyOutcome::Applied));
        assert!(reconciler.handlers().actions.is_empty());

        reconciler.receive_text(r#"{"type":"action","payload":{"kind":"move","id":"x","x":5,"y":6}}"#);
        reconciler.receive_text(
            r#"{"type":"action","payload":{"kind":"add","item":{"id":"y","tmdbId":603,"mediaType":"Movie"}}}"#,
        );

        let items = reconciler.board().items();
        assert_eq!(items.len(), 1);
        assert_eq!((items[0].id.as_str(), items[0].x, items[0].y), ("x", 5.0, 6.0));
        assert_eq!(reconciler.handlers().actions, ["move"]);
    }

    #[test]
    fn test_own_state_supersedes_pending_snapshot() {
        let mut reconciler = Reconciler::new(Recorder::default());
        reconciler.receive_text(&state_frame(&["a", "b"]));
        assert!(reconciler.frame_pending());

        let own = Envelope::from_text(&state_frame(&["c"]))
            .unwrap_or(Envelope::Presence(Presence { count: 0 }));
        assert_eq!(reconciler.apply_local(&own), None);

        assert!(!reconciler.frame_pending());
        assert!(!reconciler.on_frame());
        assert_eq!(reconciler.board().items().len(), 1);
        assert_eq!(reconciler.handlers().states, 0);
    }

    #[test]
    fn test_control_presence_and_roster_reach_handlers() {
        let mut reconciler = Reconciler::new(Recorder::default());
        reconciler.receive_text(r#"{"type":"action","payload":{"kind":"game_started","mode":"pvp"}}"#);
        reconciler.receive_text(r#"{"type":"presence","payload":{"count":3}}"#);
        reconciler.receive_text(
            r#"{"type":"roster","payload":[{"id":"p1","isHost":true,"joinedAt":"2026-01-01T00:00:00Z"}]}"#,
        );
        reconciler.receive_text("garbage");

        let handlers = reconciler.handlers();
        assert_eq!(handlers.actions, ["game_started"]);
        assert_eq!(handlers.presence, [3]);
        assert_eq!(handlers.rosters, [1]);
    }
}
