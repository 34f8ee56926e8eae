//! WebSocket message DTOs for the relay protocol.
//!
//! Every message on the wire is a JSON object tagged by its `command`
//! field. [`Command`] covers messages the relay receives from any peer;
//! [`Update`] covers messages the relay pushes to subscribers. Unknown
//! command tags fail to decode and are dropped at the boundary.

use serde::{Deserialize, Serialize};

/// A playable item in the playlist.
///
/// Identity is the 11-character opaque `id`; the same id may appear in a
/// playlist more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub author: String,
}

impl Track {
    /// Placeholder metadata for a track whose sender provided none.
    ///
    /// Resolving real metadata is the job of an external service; the relay
    /// only needs something displayable.
    pub fn placeholder(id: String) -> Self {
        Self {
            title: format!("Video {}", id),
            author: "Unknown Artist".to_string(),
            id,
        }
    }
}

/// The single "now playing" record broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub title: String,
    pub author: String,
    pub video_id: String,
    pub playlist: Vec<Track>,
    pub current_index: i64,
}

impl NowPlaying {
    /// Sentinel state before any track has been loaded.
    pub fn idle() -> Self {
        Self {
            title: "No song playing".to_string(),
            author: String::new(),
            video_id: String::new(),
            playlist: Vec::new(),
            current_index: -1,
        }
    }
}

/// Commands the relay accepts from any connected peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    /// Full snapshot replace.
    NowPlaying { params: NowPlaying },
    /// Transport hint; the relay does not own playback.
    Play,
    /// Transport hint; the relay does not own playback.
    Pause,
    Next,
    Previous,
    AddVideo {
        url: String,
        /// Pre-resolved metadata, used verbatim when present.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        info: Option<Track>,
    },
    LoadVideo { index: i64 },
    Volume { value: i64 },
    RequestCurrentSongInfo,
    /// Keepalive, silently ignored.
    Ping,
}

impl Command {
    /// The command tag as it appears on the wire, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::NowPlaying { .. } => "nowPlaying",
            Command::Play => "play",
            Command::Pause => "pause",
            Command::Next => "next",
            Command::Previous => "previous",
            Command::AddVideo { .. } => "addVideo",
            Command::LoadVideo { .. } => "loadVideo",
            Command::Volume { .. } => "volume",
            Command::RequestCurrentSongInfo => "requestCurrentSongInfo",
            Command::Ping => "ping",
        }
    }
}

/// Updates the relay pushes to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Update {
    NowPlaying { params: NowPlaying },
    VolumeUpdate { value: u8 },
}

impl Update {
    /// The command tag as it appears on the wire, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Update::NowPlaying { .. } => "nowPlaying",
            Update::VolumeUpdate { .. } => "volumeUpdate",
        }
    }
}
