//! Now-playing broadcast relay for OBS browser-source overlays.
//!
//! Accepts subscriber connections, hydrates each with the current state,
//! and rebroadcasts every accepted update to all connected clients.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hibiki-server
//! cargo run --bin hibiki-server -- --port 9000 --auto-port
//! ```

use std::path::PathBuf;

use clap::Parser;

use hibiki_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hibiki-server")]
#[command(about = "Now-playing broadcast relay for OBS overlays", long_about = None)]
struct Args {
    /// Host address to bind the relay to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the relay to
    #[arg(short = 'p', long, default_value = "8765")]
    port: u16,

    /// Probe for the next free port when the requested one is taken
    #[arg(long)]
    auto_port: bool,

    /// Sidecar file the bound port is published to
    #[arg(long, default_value = ".relay_port")]
    port_file: PathBuf,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = hibiki_server::run_server(
        args.host,
        args.port,
        args.auto_port,
        Some(args.port_file),
    )
    .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
