//! Shared utilities for the hibiki workspace.
//!
//! Logging setup and time helpers used by both the relay server and the
//! controller-side client.

pub mod logger;
pub mod time;
