//! Error types for relay command validation.

use thiserror::Error;

/// A command that failed validation.
///
/// The command is dropped without mutating state or broadcasting; the
/// message carries the offending value for the log.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Index outside the playlist bounds
    #[error("index {index} is out of range for a playlist of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// Volume outside 0-100
    #[error("volume {0} is out of range (expected 0-100)")]
    VolumeOutOfRange(i64),
}
