//! Command-line sender for the hibiki now-playing relay.
//!
//! Opens a short-lived connection, sends one command, and closes.
//! `watch` stays connected and prints every broadcast instead.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hibiki-client -- add https://www.youtube.com/watch?v=dQw4w9WgXcQ
//! cargo run --bin hibiki-client -- volume 40
//! cargo run --bin hibiki-client -- watch
//! ```

use clap::{Parser, Subcommand};

use hibiki_client::formatter::MessageFormatter;
use hibiki_client::{query_now_playing, send_command, watch};
use hibiki_server::dto::{Command, Track};
use hibiki_server::video_id::extract_video_id;
use hibiki_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hibiki-client")]
#[command(about = "Sender and watcher for the now-playing relay", long_about = None)]
struct Args {
    /// WebSocket relay URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8765/ws")]
    url: String,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Add a video to the playlist by URL or bare video id
    Add {
        /// Video URL or 11-character video id
        video: String,
        /// Pre-resolved title (requires --author; skips the placeholder metadata)
        #[arg(long)]
        title: Option<String>,
        /// Pre-resolved author (requires --title)
        #[arg(long)]
        author: Option<String>,
    },
    /// Advance to the next track (wraps around)
    Next,
    /// Go back to the previous track (wraps around)
    Previous,
    /// Ask the player to resume playback
    Play,
    /// Ask the player to pause playback
    Pause,
    /// Activate the track at the given playlist index
    Load { index: i64 },
    /// Set the playback volume (0-100)
    Volume { value: i64 },
    /// Print the current snapshot and exit
    Current,
    /// Stay connected and print every broadcast
    Watch,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let result = match args.action {
        Action::Add {
            video,
            title,
            author,
        } => {
            // The relay resolves the id itself; pre-resolved metadata has
            // to carry the id too, so resolve it here when both fields
            // were given
            let info = match (title, author) {
                (Some(title), Some(author)) => {
                    extract_video_id(&video).map(|id| Track { id, title, author })
                }
                _ => None,
            };
            send_command(&args.url, &Command::AddVideo { url: video, info }).await
        }
        Action::Next => send_command(&args.url, &Command::Next).await,
        Action::Previous => send_command(&args.url, &Command::Previous).await,
        Action::Play => send_command(&args.url, &Command::Play).await,
        Action::Pause => send_command(&args.url, &Command::Pause).await,
        Action::Load { index } => send_command(&args.url, &Command::LoadVideo { index }).await,
        Action::Volume { value } => send_command(&args.url, &Command::Volume { value }).await,
        Action::Current => query_now_playing(&args.url).await.map(|snapshot| {
            print!("{}", MessageFormatter::format_now_playing(&snapshot));
        }),
        Action::Watch => watch(&args.url).await,
    };

    if let Err(e) = result {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
