//! End-to-end tests of the realtime endpoint: real listeners, real
//! `tokio-tungstenite` clients.

use std::time::Duration;

use drawboard::prelude::*;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct Running {
    addr: String,
    hub: HubHandle,
    tokens: TokenService,
}

/// Starts a server on random ports and returns what the tests need.
async fn start_server() -> Running {
    start_server_with(HubConfig::default()).await
}

async fn start_server_with(hub: HubConfig) -> Running {
    let server = DrawboardServer::builder()
        .http_addr("127.0.0.1:0")
        .realtime_addr("127.0.0.1:0")
        .auth_config(AuthConfig::with_secret("realtime-secret"))
        .hub_config(hub)
        .build()
        .await
        .expect("server should build");

    let running = Running {
        addr: server.realtime_addr().expect("local addr").to_string(),
        hub: server.hub().clone(),
        tokens: server.tokens().clone(),
    };

    tokio::spawn(async move {
        let _ = server.run().await;
    });
    running
}

fn token_valid_for(tokens: &TokenService, ttl: chrono::Duration) -> String {
    tokens
        .issue_access_token("user-1", tokens.now() + ttl)
        .expect("should sign")
}

async fn try_connect(url: &str) -> Result<ClientWs, WsError> {
    tokio_tungstenite::connect_async(url).await.map(|(ws, _)| ws)
}

async fn connect(running: &Running) -> ClientWs {
    let token = token_valid_for(&running.tokens, chrono::Duration::minutes(5));
    try_connect(&format!("ws://{}/ws?token={token}", running.addr))
        .await
        .expect("should connect")
}

/// Next data message, skipping pings.
async fn next_message(ws: &mut ClientWs) -> Message {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("should receive within timeout")
            .expect("stream should stay open")
            .expect("should read");
        if !matches!(msg, Message::Ping(_) | Message::Pong(_)) {
            return msg;
        }
    }
}

/// Sends `count` binary frames of `size` bytes, never reading. Stops
/// early once the server has hung up.
async fn flood(ws: &mut ClientWs, count: usize, size: usize) {
    let frames = async {
        for _ in 0..count {
            if ws.send(Message::binary(vec![0u8; size])).await.is_err() {
                return;
            }
        }
    };
    let _ = tokio::time::timeout(Duration::from_secs(10), frames).await;
}

/// Sends `marker` from a client the server should no longer be
/// listening to, then checks a fresh client sees its own frame and never
/// the marker.
async fn assert_marker_not_forwarded(running: &Running, silenced: &mut ClientWs, marker: &str) {
    let mut fresh = connect(running).await;
    running.hub.wait_for_clients(1).await.unwrap();

    let _ = tokio::time::timeout(Duration::from_secs(1), silenced.send(Message::text(marker))).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let own = r#"{"type":"boardClear"}"#;
    fresh.send(Message::text(own)).await.unwrap();
    loop {
        match next_message(&mut fresh).await {
            Message::Text(text) if text.as_str() == own => break,
            Message::Text(text) => assert_ne!(text.as_str(), marker, "marker was forwarded"),
            _ => {}
        }
    }
}

fn assert_refused(result: Result<ClientWs, WsError>, status: u16) {
    match result {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), status),
        Err(other) => panic!("expected HTTP {status}, got {other}"),
        Ok(_) => panic!("expected HTTP {status}, got an open socket"),
    }
}

// =========================================================================
// Broadcast
// =========================================================================

#[tokio::test]
async fn test_broadcast_reaches_every_client_verbatim() {
    let running = start_server().await;
    let mut a = connect(&running).await;
    let mut b = connect(&running).await;
    running.hub.wait_for_clients(2).await.unwrap();

    let stroke = r#"{"type":"freehandDraw","tool":"pen","data":{"startX":1,"startY":2,"endX":3,"endY":4}}"#;
    a.send(Message::text(stroke)).await.unwrap();

    assert_eq!(next_message(&mut a).await, Message::text(stroke));
    assert_eq!(next_message(&mut b).await, Message::text(stroke));
}

#[tokio::test]
async fn test_departed_client_does_not_block_broadcast() {
    let running = start_server().await;
    let mut a = connect(&running).await;
    let mut b = connect(&running).await;
    running.hub.wait_for_clients(2).await.unwrap();

    b.close(None).await.unwrap();
    drop(b);
    running.hub.wait_for_clients(1).await.unwrap();

    let clear = r#"{"type":"boardClear"}"#;
    a.send(Message::text(clear)).await.unwrap();
    assert_eq!(next_message(&mut a).await, Message::text(clear));
}

#[tokio::test]
async fn test_binary_frames_stay_binary() {
    let running = start_server().await;
    let mut a = connect(&running).await;
    let mut b = connect(&running).await;
    running.hub.wait_for_clients(2).await.unwrap();

    a.send(Message::binary(vec![7u8, 8, 9])).await.unwrap();
    assert_eq!(next_message(&mut b).await, Message::binary(vec![7u8, 8, 9]));
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_upgrade_without_token_is_401() {
    let running = start_server().await;
    let result = try_connect(&format!("ws://{}/ws", running.addr)).await;
    assert_refused(result, 401);
}

#[tokio::test]
async fn test_upgrade_with_invalid_token_is_401() {
    let running = start_server().await;
    let result = try_connect(&format!("ws://{}/ws?token=not.a.jwt", running.addr)).await;
    assert_refused(result, 401);
}

#[tokio::test]
async fn test_upgrade_with_foreign_token_is_401() {
    let running = start_server().await;
    let other = TokenService::new(&AuthConfig::with_secret("someone-else"));
    let token = token_valid_for(&other, chrono::Duration::minutes(5));
    let result = try_connect(&format!("ws://{}/ws?token={token}", running.addr)).await;
    assert_refused(result, 401);
}

#[tokio::test]
async fn test_upgrade_on_other_path_is_404() {
    let running = start_server().await;
    let token = token_valid_for(&running.tokens, chrono::Duration::minutes(5));
    let result = try_connect(&format!("ws://{}/draw?token={token}", running.addr)).await;
    assert_refused(result, 404);
}

#[tokio::test]
async fn test_silent_peer_does_not_block_other_upgrades() {
    let running = start_server().await;
    let _silent = tokio::net::TcpStream::connect(&running.addr).await.unwrap();

    let token = token_valid_for(&running.tokens, chrono::Duration::minutes(5));
    let url = format!("ws://{}/ws?token={token}", running.addr);
    let admitted = tokio::time::timeout(Duration::from_secs(2), try_connect(&url))
        .await
        .expect("upgrade should not wait on the silent peer");
    assert!(admitted.is_ok());
    running.hub.wait_for_clients(1).await.unwrap();
}

#[tokio::test]
async fn test_refused_upgrade_does_not_stop_accept_loop() {
    let running = start_server().await;
    assert_refused(try_connect(&format!("ws://{}/ws", running.addr)).await, 401);

    let _a = connect(&running).await;
    running.hub.wait_for_clients(1).await.unwrap();
}

// =========================================================================
// Expiry watchdog
// =========================================================================

#[tokio::test]
async fn test_watchdog_sends_token_expired_then_closes() {
    let running = start_server().await;
    let token = token_valid_for(&running.tokens, chrono::Duration::seconds(2));
    let mut ws = try_connect(&format!("ws://{}/ws?token={token}", running.addr))
        .await
        .expect("token is still valid at upgrade");
    running.hub.wait_for_clients(1).await.unwrap();

    assert_eq!(
        next_message(&mut ws).await,
        Message::text(r#"{"type":"TOKEN_EXPIRED"}"#)
    );

    let after = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("socket should close promptly");
    assert!(
        matches!(after, None | Some(Ok(Message::Close(_))) | Some(Err(_))),
        "expected close after TOKEN_EXPIRED, got {after:?}"
    );
    running.hub.wait_for_clients(0).await.unwrap();
}

#[tokio::test]
async fn test_watchdog_disconnects_flooding_client_that_never_reads() {
    let running = start_server().await;
    let token = token_valid_for(&running.tokens, chrono::Duration::seconds(2));
    let mut a = try_connect(&format!("ws://{}/ws?token={token}", running.addr))
        .await
        .expect("token is still valid at upgrade");
    running.hub.wait_for_clients(1).await.unwrap();

    // A's echoes pile up on its own socket, so its writer is stuck by the
    // time the token runs out.
    flood(&mut a, 40, 1 << 20).await;

    tokio::time::timeout(Duration::from_secs(6), running.hub.wait_for_clients(0))
        .await
        .expect("expired client should leave the hub")
        .unwrap();
    assert_marker_not_forwarded(&running, &mut a, "MARK-after-expiry").await;
}

// =========================================================================
// Slow consumers
// =========================================================================

#[tokio::test]
async fn test_client_with_full_queue_is_disconnected_and_others_keep_flowing() {
    let running = start_server_with(HubConfig {
        outbound_capacity: 8,
        ..HubConfig::default()
    })
    .await;
    let mut a = connect(&running).await;
    running.hub.wait_for_clients(1).await.unwrap();

    flood(&mut a, 200, 256 * 1024).await;

    tokio::time::timeout(Duration::from_secs(5), running.hub.wait_for_clients(0))
        .await
        .expect("client that never reads should be dropped")
        .unwrap();
    assert_marker_not_forwarded(&running, &mut a, "MARK-after-drop").await;
}
