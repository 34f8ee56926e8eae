//! One-shot command sending and broadcast watching.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use hibiki_server::dto::{Command, NowPlaying, Update};

use crate::error::ClientError;
use crate::formatter::MessageFormatter;

const MAX_SEND_ATTEMPTS: u32 = 3;
const RETRY_INTERVAL_SECS: u64 = 1;

/// Send one command to the relay and close the connection.
///
/// The relay being unreachable is reported to the caller rather than
/// raised: a failed connect is retried after a fixed interval, up to
/// `MAX_SEND_ATTEMPTS` attempts in total.
pub async fn send_command(url: &str, command: &Command) -> Result<(), ClientError> {
    let payload =
        serde_json::to_string(command).map_err(|e| ClientError::SendError(e.to_string()))?;

    let mut last_error = String::new();

    for attempt in 1..=MAX_SEND_ATTEMPTS {
        tracing::debug!(
            "Connecting to {} (attempt {}/{})",
            url,
            attempt,
            MAX_SEND_ATTEMPTS
        );

        match connect_async(url).await {
            Ok((mut ws_stream, _response)) => {
                ws_stream
                    .send(Message::Text(payload.clone().into()))
                    .await
                    .map_err(|e| ClientError::SendError(e.to_string()))?;
                ws_stream.close(None).await.ok();

                tracing::info!("Sent {} command to {}", command.name(), url);
                return Ok(());
            }
            Err(e) => {
                last_error = e.to_string();
                tracing::warn!(
                    "Failed to reach relay at {}: {} (attempt {}/{})",
                    url,
                    last_error,
                    attempt,
                    MAX_SEND_ATTEMPTS
                );

                if attempt < MAX_SEND_ATTEMPTS {
                    tokio::time::sleep(Duration::from_secs(RETRY_INTERVAL_SECS)).await;
                }
            }
        }
    }

    Err(ClientError::Unreachable {
        attempts: MAX_SEND_ATTEMPTS,
        last_error,
    })
}

/// Connect, wait for the hydration snapshot, and return it.
///
/// The relay sends the current snapshot to every new subscriber before
/// anything else, so the first now-playing update is the current state.
pub async fn query_now_playing(url: &str) -> Result<NowPlaying, ClientError> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();

    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if let Ok(Update::NowPlaying { params }) = serde_json::from_str::<Update>(&text) {
                    write.close().await.ok();
                    return Ok(params);
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
            _ => {}
        }
    }

    Err(ClientError::ClosedEarly)
}

/// Stay connected and print every broadcast until the relay closes the
/// connection or the process is interrupted.
pub async fn watch(url: &str) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    tracing::info!("Connected to relay at {}", url);

    let (_write, mut read) = ws_stream.split();

    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<Update>(&text) {
                Ok(Update::NowPlaying { params }) => {
                    print!("{}", MessageFormatter::format_now_playing(&params));
                }
                Ok(Update::VolumeUpdate { value }) => {
                    print!("{}", MessageFormatter::format_volume(value));
                }
                Err(_) => {
                    print!("{}", MessageFormatter::format_raw(&text));
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("Relay closed the connection");
                break;
            }
            Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
            _ => {}
        }
    }

    Ok(())
}
