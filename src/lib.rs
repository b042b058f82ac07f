//! Cinelink relay - real-time room relay for a browser-based connect-the-movies party game
//!
//! This crate provides:
//! - A `WebSocket` pub/sub relay that shares board state and game actions between the
//!   clients of a room, with roster/host tracking
//! - A short-code snapshot store for join links, in memory or backed by a database
//! - A native client library that reconciles relayed actions and snapshots locally

pub mod client;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod routes;
pub mod snapshots;
pub mod state;
