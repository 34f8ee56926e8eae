//! Server state and connection management.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::domain::PlayerState;

/// Identifier the relay assigns to a subscriber for the lifetime of its
/// connection. Subscribers have no persistent identity across reconnects.
pub type SubscriberId = u64;

/// Subscriber connection information
pub struct ClientInfo {
    /// Message sender channel
    pub sender: mpsc::UnboundedSender<String>,
    /// Unix timestamp when connected (in JST, milliseconds)
    pub connected_at: i64,
}

/// Shared application state
///
/// The subscriber map and the player state are the only shared mutable
/// state in the process. Every mutation + broadcast sequence runs under
/// the `player` lock, so concurrent updates cannot interleave.
pub struct AppState {
    /// Map of subscriber id to their connection info
    pub connected_clients: Mutex<HashMap<SubscriberId, ClientInfo>>,
    /// The shared now-playing snapshot, playlist copy, and volume
    pub player: Mutex<PlayerState>,
    next_subscriber_id: AtomicU64,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            connected_clients: Mutex::new(HashMap::new()),
            player: Mutex::new(PlayerState::new()),
            next_subscriber_id: AtomicU64::new(1),
        }
    }

    /// Allocate the id for a newly accepted subscriber.
    pub fn next_subscriber_id(&self) -> SubscriberId {
        self.next_subscriber_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
