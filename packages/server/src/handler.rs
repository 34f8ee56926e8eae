//! WebSocket connection handlers and command dispatch.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use hibiki_shared::time::get_jst_timestamp;

use crate::domain::Direction;
use crate::dto::{Command, Track, Update};
use crate::state::{AppState, ClientInfo, SubscriberId};
use crate::video_id::extract_video_id;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let subscriber_id = state.next_subscriber_id();

    // Create a channel for this subscriber to receive broadcasts
    let (tx, rx) = mpsc::unbounded_channel();
    let connected_at = get_jst_timestamp();

    {
        let mut clients = state.connected_clients.lock().await;
        clients.insert(
            subscriber_id,
            ClientInfo {
                sender: tx,
                connected_at,
            },
        );
        tracing::info!(
            "Subscriber {} connected. Total subscribers: {}",
            subscriber_id,
            clients.len()
        );
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, subscriber_id, rx))
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    subscriber_id: SubscriberId,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    let (mut sender, mut receiver) = socket.split();

    // Hydrate the new subscriber: the current snapshot first, then the
    // current volume. Holding the player lock across both sends means a
    // concurrent update cannot slip its broadcast in between.
    {
        let player = state.player.lock().await;

        let snapshot_json = serde_json::to_string(&Update::NowPlaying {
            params: player.now_playing().clone(),
        })
        .unwrap();
        if let Err(e) = sender.send(Message::Text(snapshot_json.into())).await {
            tracing::error!(
                "Failed to send snapshot to subscriber {}: {}",
                subscriber_id,
                e
            );
            remove_subscriber(&state, subscriber_id).await;
            return;
        }

        let volume_json = serde_json::to_string(&Update::VolumeUpdate {
            value: player.volume(),
        })
        .unwrap();
        if let Err(e) = sender.send(Message::Text(volume_json.into())).await {
            tracing::error!(
                "Failed to send volume to subscriber {}: {}",
                subscriber_id,
                e
            );
            remove_subscriber(&state, subscriber_id).await;
            return;
        }

        tracing::info!("Sent current state to subscriber {}", subscriber_id);
    }

    let state_clone = state.clone();

    // Spawn a task to receive commands from this peer
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    // Decode once at the boundary. Malformed JSON and
                    // unknown command tags are dropped; the connection
                    // survives.
                    let command = match serde_json::from_str::<Command>(&text) {
                        Ok(command) => command,
                        Err(e) => {
                            tracing::warn!("Dropping unparsable message '{}': {}", text, e);
                            continue;
                        }
                    };
                    process_command(&state_clone, subscriber_id, command).await;
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Subscriber {} requested close", subscriber_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to push queued broadcasts to this subscriber
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    remove_subscriber(&state, subscriber_id).await;
}

/// Remove a subscriber from the active set.
///
/// Idempotent: removing an already-removed subscriber is a no-op.
async fn remove_subscriber(state: &Arc<AppState>, subscriber_id: SubscriberId) {
    let mut clients = state.connected_clients.lock().await;
    if let Some(info) = clients.remove(&subscriber_id) {
        tracing::info!(
            "Subscriber {} disconnected after {} ms. Remaining subscribers: {}",
            subscriber_id,
            get_jst_timestamp() - info.connected_at,
            clients.len()
        );
    }
}

/// Apply one command.
///
/// The mutation and the broadcast that follows it run under the player
/// lock, so two concurrent updates cannot interleave into a half-applied
/// state, and a joining subscriber's hydration never observes one.
async fn process_command(state: &Arc<AppState>, subscriber_id: SubscriberId, command: Command) {
    tracing::info!("Received command: {}", command.name());

    match command {
        Command::NowPlaying { params } => {
            let mut player = state.player.lock().await;
            match player.replace_now_playing(params) {
                Ok(snapshot) => {
                    tracing::info!("Updated song info: {} by {}", snapshot.title, snapshot.author);
                    let update = Update::NowPlaying {
                        params: snapshot.clone(),
                    };
                    broadcast_update(state, &update).await;
                }
                Err(e) => tracing::warn!("Rejected nowPlaying update: {}", e),
            }
        }
        Command::Play => {
            // Transport hint only; playback lives in the controller
            tracing::info!("Play command received");
        }
        Command::Pause => {
            tracing::info!("Pause command received");
        }
        Command::Next => advance(state, Direction::Next).await,
        Command::Previous => advance(state, Direction::Previous).await,
        Command::AddVideo { url, info } => {
            let Some(video_id) = extract_video_id(&url) else {
                tracing::warn!("Rejected addVideo: could not resolve a video id from '{}'", url);
                return;
            };

            // Use pre-resolved metadata when the sender provided it
            let track = info.unwrap_or_else(|| Track::placeholder(video_id.clone()));

            let mut player = state.player.lock().await;
            let update = Update::NowPlaying {
                params: player.add_track(track).clone(),
            };
            broadcast_update(state, &update).await;
            tracing::info!("Added video {} to playlist", video_id);
        }
        Command::LoadVideo { index } => {
            let mut player = state.player.lock().await;
            match player.load_track(index) {
                Ok(snapshot) => {
                    let update = Update::NowPlaying {
                        params: snapshot.clone(),
                    };
                    broadcast_update(state, &update).await;
                    tracing::info!("Loaded video at index {}", index);
                }
                Err(e) => tracing::warn!("Rejected loadVideo: {}", e),
            }
        }
        Command::Volume { value } => {
            let mut player = state.player.lock().await;
            match player.set_volume(value) {
                Ok(volume) => {
                    broadcast_update(state, &Update::VolumeUpdate { value: volume }).await;
                    tracing::info!("Volume set to {}", volume);
                }
                Err(e) => tracing::warn!("Rejected volume change: {}", e),
            }
        }
        Command::RequestCurrentSongInfo => {
            // Re-send the snapshot to exactly the requesting subscriber
            let player = state.player.lock().await;
            let snapshot_json = serde_json::to_string(&Update::NowPlaying {
                params: player.now_playing().clone(),
            })
            .unwrap();

            let clients = state.connected_clients.lock().await;
            if let Some(info) = clients.get(&subscriber_id) {
                if info.sender.send(snapshot_json).is_ok() {
                    tracing::info!("Re-sent current snapshot to subscriber {}", subscriber_id);
                } else {
                    tracing::warn!(
                        "Failed to re-send snapshot to subscriber {}",
                        subscriber_id
                    );
                }
            }
        }
        Command::Ping => {
            tracing::debug!("Received keepalive ping from subscriber {}", subscriber_id);
        }
    }
}

async fn advance(state: &Arc<AppState>, direction: Direction) {
    let mut player = state.player.lock().await;
    match player.advance(direction) {
        Some(snapshot) => {
            let update = Update::NowPlaying {
                params: snapshot.clone(),
            };
            broadcast_update(state, &update).await;
        }
        None => tracing::info!("Ignoring playlist navigation on an empty playlist"),
    }
}

/// Send an update to every connected subscriber, best-effort.
///
/// A failed channel send means the subscriber's tasks are already gone;
/// it is removed from the active set on the spot so delivery to the rest
/// is unaffected.
async fn broadcast_update(state: &Arc<AppState>, update: &Update) {
    let msg = serde_json::to_string(update).unwrap();

    let mut clients = state.connected_clients.lock().await;
    clients.retain(|subscriber_id, info| {
        let delivered = info.sender.send(msg.clone()).is_ok();
        if !delivered {
            tracing::warn!("Dropping subscriber {} after a failed send", subscriber_id);
        }
        delivered
    });

    tracing::info!("Broadcast {} to {} subscribers", update.name(), clients.len());
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Read-only view of the relay state (used by tests and for debugging)
pub async fn now_playing_state(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let player = state.player.lock().await;
    let clients = state.connected_clients.lock().await;

    Json(serde_json::json!({
        "nowPlaying": player.now_playing(),
        "volume": player.volume(),
        "subscribers": clients.len(),
    }))
}
