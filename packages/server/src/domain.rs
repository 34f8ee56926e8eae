//! Domain logic for the relay: the owned player state and the operations
//! that mutate it.
//!
//! Every state transition is synchronous and validated here, so the
//! WebSocket layer only has to decide what to broadcast. The snapshot is
//! replaced wholesale on each accepted update, never partially patched.

use crate::dto::{NowPlaying, Track};
use crate::error::CommandError;

/// Volume before any `volume` command has been accepted.
pub const DEFAULT_VOLUME: u8 = 100;

/// Direction of playlist navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// The relay's single shared player state: the current snapshot, the
/// relay's own playlist copy, and the process-wide volume.
///
/// Invariant: `0 <= current_index < playlist.len()` whenever a track is
/// active; `current_index == -1` iff no track is active.
#[derive(Debug)]
pub struct PlayerState {
    now_playing: NowPlaying,
    playlist: Vec<Track>,
    volume: u8,
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            now_playing: NowPlaying::idle(),
            playlist: Vec::new(),
            volume: DEFAULT_VOLUME,
        }
    }

    pub fn now_playing(&self) -> &NowPlaying {
        &self.now_playing
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Replace the snapshot wholesale after validating its index invariant.
    ///
    /// The snapshot's playlist becomes the relay's own playlist copy, so a
    /// later `next`/`previous` walks the list the sender last published.
    pub fn replace_now_playing(
        &mut self,
        snapshot: NowPlaying,
    ) -> Result<&NowPlaying, CommandError> {
        let len = snapshot.playlist.len();
        let index = snapshot.current_index;
        let in_range = index >= 0 && (index as usize) < len;
        if index != -1 && !in_range {
            return Err(CommandError::IndexOutOfRange { index, len });
        }

        self.playlist = snapshot.playlist.clone();
        self.now_playing = snapshot;
        Ok(&self.now_playing)
    }

    /// Recompute the current index with wraparound over the relay's own
    /// playlist copy. The playlist is cyclic under `next`/`previous`.
    ///
    /// Returns `None` (no-op) when the playlist is empty.
    pub fn advance(&mut self, direction: Direction) -> Option<&NowPlaying> {
        if self.playlist.is_empty() {
            return None;
        }

        let len = self.playlist.len() as i64;
        let step = match direction {
            Direction::Next => 1,
            Direction::Previous => -1,
        };
        // rem_euclid keeps the result non-negative even from index -1
        let index = (self.now_playing.current_index + step).rem_euclid(len);

        self.activate(index as usize);
        Some(&self.now_playing)
    }

    /// Append a track. Duplicate ids are allowed.
    ///
    /// The first track ever added becomes the active one; otherwise only
    /// the snapshot's playlist view is refreshed.
    pub fn add_track(&mut self, track: Track) -> &NowPlaying {
        self.playlist.push(track);
        if self.playlist.len() == 1 {
            self.activate(0);
        } else {
            self.now_playing.playlist = self.playlist.clone();
        }
        &self.now_playing
    }

    /// Activate the track at `index` if it is in range.
    pub fn load_track(&mut self, index: i64) -> Result<&NowPlaying, CommandError> {
        if index < 0 || (index as usize) >= self.playlist.len() {
            return Err(CommandError::IndexOutOfRange {
                index,
                len: self.playlist.len(),
            });
        }

        self.activate(index as usize);
        Ok(&self.now_playing)
    }

    /// Store a new volume, rejecting values outside 0-100.
    pub fn set_volume(&mut self, value: i64) -> Result<u8, CommandError> {
        if !(0..=100).contains(&value) {
            return Err(CommandError::VolumeOutOfRange(value));
        }

        self.volume = value as u8;
        Ok(self.volume)
    }

    fn activate(&mut self, index: usize) {
        let track = &self.playlist[index];
        self.now_playing = NowPlaying {
            title: track.title.clone(),
            author: track.author.clone(),
            video_id: track.id.clone(),
            playlist: self.playlist.clone(),
            current_index: index as i64,
        };
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}
