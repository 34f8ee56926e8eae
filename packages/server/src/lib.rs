//! WebSocket now-playing relay server implementation.
//!
//! Holds the single shared "now playing" snapshot and volume, hydrates
//! every new subscriber with the current state, and fans out accepted
//! updates to all connected overlay clients.

mod domain;
mod error;
mod handler;
mod runner;
mod signal;
mod state;

pub mod dto;
pub mod video_id;

pub use runner::run_server;
