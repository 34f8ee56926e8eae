//! Error types for the relay client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to push a command over an established connection
    #[error("Send error: {0}")]
    SendError(String),

    /// The relay stayed unreachable through every attempt
    #[error("Relay unreachable after {attempts} attempts: {last_error}")]
    Unreachable { attempts: u32, last_error: String },

    /// The connection closed before the expected reply arrived
    #[error("Connection closed before a snapshot was received")]
    ClosedEarly,
}
