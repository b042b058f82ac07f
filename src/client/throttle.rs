use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default minimum spacing between sends of a continuous action (drag-move).
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(60);

type Sink<T> = Arc<dyn Fn(T) + Send + Sync>;

#[derive(Debug)]
struct ThrottleState {
    last_sent: Option<Instant>,
    /// Bumped on every scheduled send; a woken timer that no longer matches was superseded.
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// Trailing-edge throttle: at most one send per interval, and the latest value always
/// goes out.
///
/// A call arriving after the interval has elapsed sends immediately. A call arriving
/// sooner replaces any scheduled send with one that fires when the interval lapses,
/// carrying this call's value.
pub struct Throttle<T> {
    interval: Duration,
    sink: Sink<T>,
    state: Arc<Mutex<ThrottleState>>,
}

impl<T> Clone for Throttle<T> {
    fn clone(&self) -> Self {
        Self {
            interval: self.interval,
            sink: Arc::clone(&self.sink),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> std::fmt::Debug for Throttle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Throttle<T> {
    pub fn new(interval: Duration, sink: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            interval,
            sink: Arc::new(sink),
            state: Arc::new(Mutex::new(ThrottleState {
                last_sent: None,
                generation: 0,
                pending: None,
            })),
        }
    }

    /// Submit a value. Must be called from within a Tokio runtime.
    pub fn emit(&self, value: T) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        state.generation = state.generation.wrapping_add(1);
        if let Some(previous) = state.pending.take() {
            previous.abort();
        }

        let elapsed = state.last_sent.map(|last| now.saturating_duration_since(last));
        match elapsed {
            Some(elapsed) if elapsed < self.interval => {
                let wait = self.interval - elapsed;
                let generation = state.generation;
                let shared = Arc::clone(&self.state);
                let sink = Arc::clone(&self.sink);

                state.pending = Some(tokio::spawn(async move {
                    tokio::time::sleep(wait).await;
                    {
                        let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                        if state.generation != generation {
                            return;
                        }
                        state.last_sent = Some(Instant::now());
                        state.pending = None;
                    }
                    sink(value);
                }));
            }
            _ => {
                state.last_sent = Some(now);
                drop(state);
                (self.sink)(value);
            }
        }
    }

    /// Drop any scheduled trailing send.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.generation = state.generation.wrapping_add(1);
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .is_some()
    }
}
