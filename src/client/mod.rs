//! Client-side reconciliation for relay peers.
//!
//! Relayed actions are deduplicated by content-derived keys, bursts of `state` snapshots
//! are applied at most once per rendering tick, and continuous actions are throttled on
//! the way out. [`RelayClient`] wires these to a live relay connection.

mod board;
mod connection;
mod frame;
mod reconcile;
mod throttle;

pub use board::{ApplyOutcome, LocalBoard};
pub use connection::{
    ClientConfig, ClientError, ConnectionState, DEFAULT_FRAME_INTERVAL, RelayClient,
};
pub use frame::FrameCoalescer;
pub use reconcile::{GameHandlers, Reconciler};
pub use throttle::{DEFAULT_THROTTLE_INTERVAL, Throttle};
