use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Room joined when the connection URL carries no `room`.
pub const DEFAULT_ROOM: &str = "default";

const ANON_PREFIX: &str = "anon_";
const ANON_SUFFIX_LENGTH: usize = 6;

/// Server-side identity of one connection. Distinct from the client-chosen id, which
/// may collide.
pub type SessionId = Uuid;

/// Outbound half of a session's bounded frame queue.
pub type WsTx = mpsc::Sender<String>;

/// Why a frame could not be queued for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The peer is not draining its queue fast enough.
    Full,
    /// The socket writer has already gone away.
    Closed,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("outbound queue full"),
            Self::Closed => f.write_str("connection closed"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Handle to one live client connection, as tracked by the room registry.
///
/// Cloning is cheap; every clone refers to the same socket queue and last-seen clock.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    client_id: String,
    room: String,
    joined_at: DateTime<Utc>,
    last_seen_ms: Arc<AtomicI64>,
    tx: WsTx,
}

impl SessionHandle {
    #[must_use]
    pub fn new(client_id: impl Into<String>, tx: WsTx) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id: client_id.into(),
            room: String::new(),
            joined_at: now,
            last_seen_ms: Arc::new(AtomicI64::new(now.timestamp_millis())),
            tx,
        }
    }

    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The room this session belongs to; empty until admitted.
    #[must_use]
    pub fn room(&self) -> &str {
        &self.room
    }

    #[must_use]
    pub const fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    #[must_use]
    pub fn last_seen(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_seen_ms.load(Ordering::Relaxed))
            .unwrap_or(self.joined_at)
    }

    /// Record inbound activity from the client.
    pub fn touch(&self) {
        self.last_seen_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a frame without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Full`] when the peer's queue is at capacity and
    /// [`DeliveryError::Closed`] when its writer task has ended.
    pub fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        self.tx.try_send(text.to_string()).map_err(|err| match err {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    pub(crate) fn assign_room(&mut self, room: &str, joined_at: DateTime<Utc>) {
        room.clone_into(&mut self.room);
        self.joined_at = joined_at;
    }
}

/// Room code from the connection URL, falling back to [`DEFAULT_ROOM`].
#[must_use]
pub fn resolve_room(requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|room| !room.is_empty())
        .unwrap_or(DEFAULT_ROOM)
        .to_string()
}

/// Client id from the connection URL, falling back to a generated `anon_xxxxxx`.
#[must_use]
pub fn resolve_client_id(requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map_or_else(anonymous_client_id, str::to_string)
}

fn anonymous_client_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ANON_SUFFIX_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{ANON_PREFIX}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_room_defaults() {
        assert_eq!(resolve_room(None), "default");
        assert_eq!(resolve_room(Some("   ")), "default");
        assert_eq!(resolve_room(Some("ABCD")), "ABCD");
    }

    #[test]
    fn test_resolve_client_id_generates_anonymous() {
        let id = resolve_client_id(None);
        assert!(id.starts_with("anon_"));
        assert_eq!(id.len(), "anon_".len() + 6);
        assert!(id["anon_".len()..].chars().all(|c| c.is_ascii_alphanumeric()));

        assert_eq!(resolve_client_id(Some("p1")), "p1");
    }

    #[tokio::test]
    async fn test_deliver_reports_full_and_closed() {
        let (tx, rx) = mpsc::channel(1);
        let session = SessionHandle::new("p1", tx);

        assert_eq!(session.deliver("one"), Ok(()));
        assert_eq!(session.deliver("two"), Err(DeliveryError::Full));

        drop(rx);
        assert!(!session.is_open());
        assert_eq!(session.deliver("three"), Err(DeliveryError::Closed));
    }
}
