use crate::config::Config;
use crate::relay::Relay;
use crate::snapshots::Snapshots;

/// Shared application state available to all request handlers via Axum's `State` extractor.
///
/// Constructed once by the process entry point; tests build as many isolated instances as
/// they need.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
    pub relay: Relay,
    pub snapshots: Snapshots,
}

impl AppState {
    /// In-memory state (no database) for the given configuration.
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        Self {
            relay: Relay::new(config.outbound_buffer),
            snapshots: Snapshots::in_memory(config.snapshot_ttl),
            config,
        }
    }
}
