//! Native relay client: connection state machine plus a queued outbox.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::protocol::{Action, Envelope};
use crate::relay::{DEFAULT_ROOM, resolve_client_id};

use super::reconcile::{GameHandlers, Reconciler};
use super::throttle::Throttle;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default rendering tick used to coalesce inbound snapshots (~60 fps).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Frames held while disconnected; beyond this the oldest are dropped.
pub const MAX_QUEUED_FRAMES: usize = 512;

/// Lifecycle of a [`RelayClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Client errors surfaced to the caller.
#[derive(Debug)]
pub enum ClientError {
    /// The envelope could not be encoded
    Encode(serde_json::Error),
    /// The client task has shut down
    Closed,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "Failed to encode envelope: {err}"),
            Self::Closed => write!(f, "Relay client has shut down"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Where and as whom to connect.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay base URL, e.g. `ws://127.0.0.1:3001`
    pub base_url: String,
    pub room: String,
    pub client_id: String,
    pub frame_interval: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            room: DEFAULT_ROOM.to_string(),
            client_id: resolve_client_id(None),
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    #[must_use]
    pub const fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }

    /// Full relay URL with `room` and `id` query parameters.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}/ws?room={}&id={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.room),
            urlencoding::encode(&self.client_id)
        )
    }
}

enum Command {
    Connect,
    Send { envelope: Envelope, text: String },
    Close,
}

/// Handle to a background relay connection.
///
/// Frames sent while not `Connected` are queued and flushed in order as soon as the
/// connection is (re)established. Nothing reconnects automatically: after a drop the
/// state returns to `Disconnected` and the caller decides when to [`connect`] again.
///
/// [`connect`]: RelayClient::connect
#[derive(Debug, Clone)]
pub struct RelayClient {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("Connect"),
            Self::Send { envelope, .. } => write!(f, "Send({})", envelope.message_type().as_str()),
            Self::Close => f.write_str("Close"),
        }
    }
}

impl RelayClient {
    /// Start the client task. It stays `Disconnected` until [`RelayClient::connect`].
    pub fn spawn<H>(config: ClientConfig, handlers: H) -> (Self, JoinHandle<Reconciler<H>>)
    where
        H: GameHandlers + 'static,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let task = tokio::spawn(run(config, Reconciler::new(handlers), command_rx, state_tx));
        (Self { commands, state }, task)
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Begin connecting (no-op when already connected).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] if the client task has shut down.
    pub fn connect(&self) -> Result<(), ClientError> {
        self.commands
            .send(Command::Connect)
            .map_err(|_| ClientError::Closed)
    }

    /// Send an envelope now, or queue it until connected.
    ///
    /// Outgoing `action` and `state` envelopes are folded into this client's own board first.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be encoded or the client has shut down.
    pub fn send(&self, envelope: &Envelope) -> Result<(), ClientError> {
        let text = envelope.to_text().map_err(ClientError::Encode)?;
        self.commands
            .send(Command::Send {
                envelope: envelope.clone(),
                text,
            })
            .map_err(|_| ClientError::Closed)
    }

    /// Close the socket and stop the client task.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Wait until the connection reaches `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] if the client task ends first.
    pub async fn wait_for(&self, target: ConnectionState) -> Result<(), ClientError> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| *s == target)
            .await
            .map(|_| ())
            .map_err(|_| ClientError::Closed)
    }

    /// A throttled sender for continuous actions such as drag-moves.
    #[must_use]
    pub fn throttled_actions(&self, interval: Duration) -> Throttle<Action> {
        let client = self.clone();
        Throttle::new(interval, move |action| {
            if let Err(err) = client.send(&Envelope::Action(action)) {
                tracing::debug!("Dropping throttled action: {err}");
            }
        })
    }
}

async fn next_frame(socket: &mut Option<WsStream>) -> Option<Result<Message, WsError>> {
    match socket {
        Some(ws) => ws.next().await,
        None => std::future::pending().await,
    }
}

#[derive(Debug)]
struct Queued {
    text: String,
    /// Item updated by a continuous action; a newer one for the same item replaces it.
    supersedes: Option<String>,
}

/// Frames waiting for a live connection, oldest first.
#[derive(Debug)]
struct Outbox {
    frames: VecDeque<Queued>,
    capacity: usize,
}

impl Outbox {
    fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn push(&mut self, envelope: &Envelope, text: String) {
        let supersedes = match envelope {
            Envelope::Action(action) => action.continuous_target().map(str::to_string),
            _ => None,
        };
        if let Some(target) = &supersedes {
            self.frames
                .retain(|queued| queued.supersedes.as_ref() != Some(target));
        }

        if self.frames.len() >= self.capacity
            && let Some(dropped) = self.frames.pop_front()
        {
            tracing::warn!(
                capacity = self.capacity,
                bytes = dropped.text.len(),
                "Outbox full; dropping oldest queued frame"
            );
        }
        self.frames.push_back(Queued { text, supersedes });
    }

    fn len(&self) -> usize {
        self.frames.len()
    }

    /// Write queued frames in order. On failure the unsent frame goes back to the front.
    async fn flush(&mut self, ws: &mut WsStream) -> bool {
        while let Some(queued) = self.frames.pop_front() {
            if let Err(err) = ws.send(Message::text(queued.text.clone())).await {
                tracing::warn!("Relay send failed: {err}");
                self.frames.push_front(queued);
                return false;
            }
        }
        true
    }
}

async fn run<H: GameHandlers>(
    config: ClientConfig,
    mut reconciler: Reconciler<H>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ConnectionState>,
) -> Reconciler<H> {
    let url = config.url();
    let mut socket: Option<WsStream> = None;
    let mut outbox = Outbox::new(MAX_QUEUED_FRAMES);
    let mut ticker = tokio::time::interval(config.frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Connect) => {
                    if socket.is_some() {
                        continue;
                    }
                    state.send_replace(ConnectionState::Connecting);
                    match connect_async(url.as_str()).await {
                        Ok((mut ws, _)) => {
                            tracing::info!(
                                room = %config.room,
                                client_id = %config.client_id,
                                "Connected to relay"
                            );
                            if outbox.flush(&mut ws).await {
                                socket = Some(ws);
                                state.send_replace(ConnectionState::Connected);
                            } else {
                                state.send_replace(ConnectionState::Disconnected);
                            }
                        }
                        Err(err) => {
                            tracing::warn!(%url, "Relay connection failed: {err}");
                            state.send_replace(ConnectionState::Disconnected);
                        }
                    }
                }
                Some(Command::Send { envelope, text }) => {
                    reconciler.apply_local(&envelope);
                    outbox.push(&envelope, text);
                    match socket.as_mut() {
                        Some(ws) => {
                            if !outbox.flush(ws).await {
                                socket = None;
                                state.send_replace(ConnectionState::Disconnected);
                            }
                        }
                        None => tracing::trace!(queued = outbox.len(), "Queued frame until connected"),
                    }
                }
                Some(Command::Close) | None => {
                    if let Some(mut ws) = socket.take() {
                        let _ = ws.close(None).await;
                    }
                    state.send_replace(ConnectionState::Disconnected);
                    break;
                }
            },
            frame = next_frame(&mut socket) => match frame {
                Some(Ok(Message::Text(text))) => reconciler.receive_text(text.as_str()),
                Some(Ok(Message::Close(_)) | Err(_)) | None => {
                    tracing::info!(room = %config.room, "Relay connection closed");
                    socket = None;
                    state.send_replace(ConnectionState::Disconnected);
                }
                Some(Ok(_)) => {}
            },
            _ = ticker.tick(), if reconciler.frame_pending() => {
                reconciler.on_frame();
            }
        }
    }

    reconciler
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_query() {
        let config = ClientConfig::new("ws://127.0.0.1:3001/")
            .with_room("AB CD")
            .with_client_id("p&1");
        assert_eq!(config.url(), "ws://127.0.0.1:3001/ws?room=AB%20CD&id=p%261");
    }

    #[test]
    fn test_default_identity() {
        let config = ClientConfig::new("ws://localhost:3001");
        assert_eq!(config.room, "default");
        assert!(config.client_id.starts_with("anon_"));
    }

    fn queued_texts(outbox: &Outbox) -> Vec<&str> {
        outbox.frames.iter().map(|q| q.text.as_str()).collect()
    }

    #[test]
    fn test_outbox_keeps_latest_move_per_item() {
        let mut outbox = Outbox::new(MAX_QUEUED_FRAMES);
        let drag = |id: &str, x: f64| {
            Envelope::Action(Action::Move {
                id: id.to_string(),
                x,
                y: 0.0,
            })
        };

        outbox.push(&drag("a", 0.0), "a0".to_string());
        outbox.push(&drag("b", 0.0), "b0".to_string());
        for step in 1..=50_u32 {
            outbox.push(&drag("a", f64::from(step)), format!("a{step}"));
        }
        assert_eq!(queued_texts(&outbox), ["b0", "a50"]);
    }

    #[test]
    fn test_outbox_drops_oldest_when_full() {
        let mut outbox = Outbox::new(2);
        let end = Envelope::Action(Action::EndGame(crate::protocol::ControlFields::new()));
        for text in ["e1", "e2", "e3"] {
            outbox.push(&end, text.to_string());
        }
        assert_eq!(queued_texts(&outbox), ["e2", "e3"]);
        assert_eq!(outbox.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_connect_returns_to_disconnected() {
        // Nothing listens on port 9 (discard) in test environments
        let config = ClientConfig::new("ws://127.0.0.1:9");
        let (client, task) = RelayClient::spawn(config, ());

        assert_eq!(client.connect().ok(), Some(()));
        let _ = client
            .send(&Envelope::Action(Action::EndGame(crate::protocol::ControlFields::new())));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.close();
        assert!(task.await.is_ok());
    }
}
