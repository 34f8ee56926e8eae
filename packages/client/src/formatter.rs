//! Formatting of relay updates for terminal display.

use hibiki_server::dto::NowPlaying;

/// Formats relay updates for watch-mode terminal output.
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a now-playing snapshot as a one-line status.
    pub fn format_now_playing(snapshot: &NowPlaying) -> String {
        if snapshot.current_index < 0 {
            return format!(
                "-- {} ({} queued)\n",
                snapshot.title,
                snapshot.playlist.len()
            );
        }

        format!(
            "> {} by {} [{}] ({}/{})\n",
            snapshot.title,
            snapshot.author,
            snapshot.video_id,
            snapshot.current_index + 1,
            snapshot.playlist.len()
        )
    }

    /// Format a volume update.
    pub fn format_volume(value: u8) -> String {
        format!("> volume {}\n", value)
    }

    /// Format a message that could not be parsed as a known update.
    pub fn format_raw(text: &str) -> String {
        format!("? {}\n", text)
    }
}
