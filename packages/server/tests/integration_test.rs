//! Integration tests driving a really-bound relay over WebSocket and HTTP.
//!
//! Each test runs its own relay on a dedicated port inside the test
//! runtime and talks to it with a plain tokio-tungstenite client, the
//! same way an overlay or the controller would.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use hibiki_server::dto::{Command, NowPlaying, Track, Update};
use hibiki_server::run_server;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// Spawn a relay on `port` and wait until it accepts connections.
async fn spawn_relay(port: u16) {
    tokio::spawn(run_server("127.0.0.1".to_string(), port, false, None));
    wait_until_ready(port).await;
}

async fn wait_until_ready(port: u16) {
    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("relay on port {} did not come up", port);
}

async fn connect(port: u16) -> WsClient {
    let (ws, _response) = connect_async(format!("ws://127.0.0.1:{}/ws", port))
        .await
        .expect("Failed to connect to relay");
    ws
}

/// Receive the next text frame and decode it as an `Update`.
async fn recv_update(ws: &mut WsClient) -> Update {
    loop {
        let message = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for an update")
            .expect("Connection closed while waiting for an update")
            .expect("WebSocket error while waiting for an update");

        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("Relay sent an undecodable update");
        }
    }
}

/// Receive and check the two hydration messages every subscriber gets.
async fn drain_hydration(ws: &mut WsClient) -> (NowPlaying, u8) {
    let snapshot = expect_now_playing(recv_update(ws).await);
    let volume = match recv_update(ws).await {
        Update::VolumeUpdate { value } => value,
        other => panic!("Expected a volumeUpdate after the snapshot, got {:?}", other),
    };
    (snapshot, volume)
}

fn expect_now_playing(update: Update) -> NowPlaying {
    match update {
        Update::NowPlaying { params } => params,
        other => panic!("Expected a nowPlaying update, got {:?}", other),
    }
}

async fn send(ws: &mut WsClient, command: &Command) {
    let payload = serde_json::to_string(command).unwrap();
    ws.send(Message::Text(payload.into()))
        .await
        .expect("Failed to send command");
}

fn track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Track {}", id),
        author: "Test Artist".to_string(),
    }
}

fn add_video(id: &str) -> Command {
    Command::AddVideo {
        url: id.to_string(),
        info: Some(track(id)),
    }
}

async fn relay_state(port: u16) -> serde_json::Value {
    reqwest::get(format!("http://127.0.0.1:{}/api/now-playing", port))
        .await
        .expect("Failed to query relay state")
        .json()
        .await
        .expect("Relay state was not JSON")
}

#[tokio::test]
async fn test_new_subscriber_is_hydrated_with_sentinel_state() {
    // テスト項目: 新規購読者が接続直後にセンチネル状態と音量を受信する
    // given (前提条件):
    let port = 18865;
    spawn_relay(port).await;

    // when (操作):
    let mut ws = connect(port).await;
    let (snapshot, volume) = drain_hydration(&mut ws).await;

    // then (期待する結果): スナップショット、音量の順で届く
    assert_eq!(snapshot.title, "No song playing");
    assert_eq!(snapshot.current_index, -1);
    assert!(snapshot.playlist.is_empty());
    assert_eq!(volume, 100);
}

#[tokio::test]
async fn test_late_subscriber_observes_current_state() {
    // テスト項目: 更新後に接続した購読者が最新状態で初期化される
    // given (前提条件):
    let port = 18866;
    spawn_relay(port).await;

    let mut sender_ws = connect(port).await;
    drain_hydration(&mut sender_ws).await;

    // when (操作): トラック追加と音量変更を行ってから新規購読者が接続する
    send(&mut sender_ws, &add_video("AAAAAAAAAAA")).await;
    expect_now_playing(recv_update(&mut sender_ws).await);
    send(&mut sender_ws, &Command::Volume { value: 55 }).await;
    recv_update(&mut sender_ws).await;

    let mut late_ws = connect(port).await;
    let (snapshot, volume) = drain_hydration(&mut late_ws).await;

    // then (期待する結果): 古い状態やデフォルト値は届かない
    assert_eq!(snapshot.current_index, 0);
    assert_eq!(snapshot.video_id, "AAAAAAAAAAA");
    assert_eq!(volume, 55);
}

#[tokio::test]
async fn test_broadcast_survives_an_abruptly_dropped_subscriber() {
    // テスト項目: 1 購読者の切断がブロードキャストを妨げず、切断者が購読者集合から消える
    // given (前提条件):
    let port = 18867;
    spawn_relay(port).await;

    let mut ws_a = connect(port).await;
    drain_hydration(&mut ws_a).await;
    let mut ws_b = connect(port).await;
    drain_hydration(&mut ws_b).await;
    let ws_c = connect(port).await;

    // when (操作): C を唐突に切断してから A が更新を送る
    drop(ws_c);
    send(&mut ws_a, &add_video("AAAAAAAAAAA")).await;

    // then (期待する結果): 残りの 2 購読者には更新が届く
    let snapshot_a = expect_now_playing(recv_update(&mut ws_a).await);
    let snapshot_b = expect_now_playing(recv_update(&mut ws_b).await);
    assert_eq!(snapshot_a.video_id, "AAAAAAAAAAA");
    assert_eq!(snapshot_b.video_id, "AAAAAAAAAAA");

    // 切断された購読者はやがて購読者集合から取り除かれる
    for _ in 0..20 {
        if relay_state(port).await["subscribers"] == 2 {
            return;
        }
        sleep(Duration::from_millis(100)).await;
    }
    panic!("Dropped subscriber was not removed from the active set");
}

#[tokio::test]
async fn test_invalid_index_and_volume_are_rejected_without_broadcast() {
    // テスト項目: 範囲外の loadVideo / volume が状態を変えず、ブロードキャストも発生しない
    // given (前提条件):
    let port = 18868;
    spawn_relay(port).await;

    let mut ws = connect(port).await;
    drain_hydration(&mut ws).await;

    // when (操作): 不正なコマンドを送った後に正当な volume を送る
    send(&mut ws, &Command::LoadVideo { index: 5 }).await;
    send(&mut ws, &Command::Volume { value: 150 }).await;
    send(&mut ws, &Command::Volume { value: -1 }).await;
    send(&mut ws, &Command::Volume { value: 40 }).await;

    // then (期待する結果): 次に届く更新は正当な volume のものだけ
    match recv_update(&mut ws).await {
        Update::VolumeUpdate { value } => assert_eq!(value, 40),
        other => panic!("Expected only the valid volume broadcast, got {:?}", other),
    }

    let state = relay_state(port).await;
    assert_eq!(state["volume"], 40);
    assert_eq!(state["nowPlaying"]["currentIndex"], -1);
}

#[tokio::test]
async fn test_malformed_messages_keep_the_connection_alive() {
    // テスト項目: 解析不能なメッセージと未知のコマンドが破棄され、接続が生き続ける
    // given (前提条件):
    let port = 18869;
    spawn_relay(port).await;

    let mut ws = connect(port).await;
    drain_hydration(&mut ws).await;

    // when (操作): 不正なペイロードを送った後に正当なコマンドを送る
    ws.send(Message::Text("definitely not json".into()))
        .await
        .unwrap();
    ws.send(Message::Text(r#"{"command":"flyToTheMoon"}"#.into()))
        .await
        .unwrap();
    send(&mut ws, &Command::Ping).await;
    send(&mut ws, &add_video("AAAAAAAAAAA")).await;

    // then (期待する結果): 同じ接続で正当なコマンドが処理される
    let snapshot = expect_now_playing(recv_update(&mut ws).await);
    assert_eq!(snapshot.video_id, "AAAAAAAAAAA");
}

#[tokio::test]
async fn test_request_current_song_info_resends_to_requester_only() {
    // テスト項目: requestCurrentSongInfo が要求元だけにスナップショットを再送する
    // given (前提条件):
    let port = 18870;
    spawn_relay(port).await;

    let mut ws_a = connect(port).await;
    drain_hydration(&mut ws_a).await;
    let mut ws_b = connect(port).await;
    drain_hydration(&mut ws_b).await;

    // when (操作): A がスナップショットの再送を要求する
    send(&mut ws_a, &Command::RequestCurrentSongInfo).await;

    // then (期待する結果): A はスナップショットを受け取る
    let snapshot = expect_now_playing(recv_update(&mut ws_a).await);
    assert_eq!(snapshot.title, "No song playing");

    // B には再送が届かない: B の次の受信は自分の volume 変更の結果になる
    send(&mut ws_b, &Command::Volume { value: 70 }).await;
    match recv_update(&mut ws_b).await {
        Update::VolumeUpdate { value } => assert_eq!(value, 70),
        other => panic!("B should not have received the re-sent snapshot: {:?}", other),
    }
}

#[tokio::test]
async fn test_playlist_navigation_wraps_around() {
    // テスト項目: next / previous がプレイリスト両端で巻き戻る
    // given (前提条件):
    let port = 18871;
    spawn_relay(port).await;

    let mut ws = connect(port).await;
    drain_hydration(&mut ws).await;

    // 1 件目の追加で再生が始まり、2 件目では currentIndex が変わらない
    send(&mut ws, &add_video("AAAAAAAAAAA")).await;
    let first = expect_now_playing(recv_update(&mut ws).await);
    assert_eq!(first.current_index, 0);

    send(&mut ws, &add_video("BBBBBBBBBBB")).await;
    let second = expect_now_playing(recv_update(&mut ws).await);
    assert_eq!(second.current_index, 0);
    assert_eq!(second.playlist.len(), 2);

    // when (操作): 末尾のトラックを再生してから next を送る
    send(&mut ws, &Command::LoadVideo { index: 1 }).await;
    let loaded = expect_now_playing(recv_update(&mut ws).await);
    assert_eq!(loaded.current_index, 1);

    send(&mut ws, &Command::Next).await;
    let wrapped_forward = expect_now_playing(recv_update(&mut ws).await);

    // then (期待する結果): 先頭に巻き戻る
    assert_eq!(wrapped_forward.current_index, 0);
    assert_eq!(wrapped_forward.video_id, "AAAAAAAAAAA");

    // when (操作): 先頭から previous を送る
    send(&mut ws, &Command::Previous).await;
    let wrapped_backward = expect_now_playing(recv_update(&mut ws).await);

    // then (期待する結果): 末尾に巻き戻る
    assert_eq!(wrapped_backward.current_index, 1);
    assert_eq!(wrapped_backward.video_id, "BBBBBBBBBBB");
}

#[tokio::test]
async fn test_now_playing_replace_is_validated() {
    // テスト項目: 範囲外インデックスのスナップショットが棄却され、正当なものだけ反映される
    // given (前提条件):
    let port = 18872;
    spawn_relay(port).await;

    let mut ws = connect(port).await;
    drain_hydration(&mut ws).await;

    let invalid = NowPlaying {
        playlist: vec![track("AAAAAAAAAAA")],
        current_index: 3,
        ..NowPlaying::idle()
    };
    let valid = NowPlaying {
        title: "Track BBBBBBBBBBB".to_string(),
        author: "Test Artist".to_string(),
        video_id: "BBBBBBBBBBB".to_string(),
        playlist: vec![track("BBBBBBBBBBB")],
        current_index: 0,
    };

    // when (操作): 不正なスナップショットに続けて正当なものを送る
    send(&mut ws, &Command::NowPlaying { params: invalid }).await;
    send(
        &mut ws,
        &Command::NowPlaying {
            params: valid.clone(),
        },
    )
    .await;

    // then (期待する結果): 届くのは正当なスナップショットだけ
    let received = expect_now_playing(recv_update(&mut ws).await);
    assert_eq!(received, valid);

    let state = relay_state(port).await;
    assert_eq!(state["nowPlaying"]["videoId"], "BBBBBBBBBBB");
}

#[tokio::test]
async fn test_bound_port_is_published_to_the_sidecar_file() {
    // テスト項目: バインドしたポートがサイドカーファイルに書き出される
    // given (前提条件):
    let port = 18873;
    let port_file = std::env::temp_dir().join("hibiki_test_relay_port");
    let _ = std::fs::remove_file(&port_file);

    // when (操作):
    tokio::spawn(run_server(
        "127.0.0.1".to_string(),
        port,
        false,
        Some(port_file.clone()),
    ));
    wait_until_ready(port).await;

    // then (期待する結果):
    let contents = std::fs::read_to_string(&port_file).expect("Port file was not written");
    assert_eq!(contents, port.to_string());

    let _ = std::fs::remove_file(&port_file);
}

#[tokio::test]
async fn test_health_endpoint_responds() {
    // テスト項目: ヘルスチェックエンドポイントが応答する
    // given (前提条件):
    let port = 18874;
    spawn_relay(port).await;

    // when (操作):
    let body: serde_json::Value = reqwest::get(format!("http://127.0.0.1:{}/api/health", port))
        .await
        .expect("Failed to reach health endpoint")
        .json()
        .await
        .expect("Health response was not JSON");

    // then (期待する結果):
    assert_eq!(body, serde_json::json!({"status": "ok"}));
}
