//! Controller-side client for the hibiki now-playing relay.
//!
//! Provides a fire-and-forget command sender with bounded retry, a
//! one-shot snapshot query, and a watch mode that tails relay broadcasts.

pub mod error;
pub mod formatter;
pub mod sender;

pub use error::ClientError;
pub use sender::{query_now_playing, send_command, watch};
