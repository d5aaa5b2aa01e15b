//! Per-connection handler: one reader, one writer, one expiry watchdog.
//!
//! Every admitted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Register a [`Client`] with the hub (its outbound queue feeds the writer)
//!   2. Spawn the writer: drain the queue onto the socket
//!   3. Read frames and hand each one to the hub until the first of:
//!      the socket closes, the hub drops the client, or the token expires
//!      (then `TOKEN_EXPIRED` is sent)
//!   4. Close the socket, which also abandons a write stuck on the peer

use std::sync::Arc;
use std::time::Duration;

use drawboard_auth::{TokenService, VerifiedToken};
use drawboard_hub::{Client, HubHandle};
use drawboard_protocol::ControlFrame;
use drawboard_transport::{Connection, ConnectionId, Frame, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::DrawboardError;

/// How long the expiry notice may wait for the socket before the
/// connection is closed without it.
const NOTICE_TIMEOUT: Duration = Duration::from_secs(1);

/// Drop guard that takes the client out of the hub when the handler exits.
///
/// Runs on every exit path, panics included. `Drop` is synchronous, so the
/// unregister goes out on a fire-and-forget task.
struct ClientGuard {
    id: ConnectionId,
    hub: HubHandle,
    writer: JoinHandle<()>,
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.writer.abort();
        let id = self.id;
        let hub = self.hub.clone();
        tokio::spawn(async move {
            // A second unregister is a no-op, and a dead hub has nothing to clean.
            let _ = hub.unregister(id).await;
        });
    }
}

/// Handles a single admitted connection from registration to close.
///
/// `token` is what the handshake gate verified; its expiry arms the
/// watchdog. Returns once the socket is closed by either side, the hub
/// has dropped the client, or the token has expired.
pub async fn handle_connection(
    conn: WebSocketConnection,
    token: VerifiedToken,
    hub: HubHandle,
    tokens: TokenService,
    outbound_capacity: usize,
) -> Result<(), DrawboardError> {
    let conn = Arc::new(conn);
    let id = conn.id();

    let (client, outbound) = Client::new(id, outbound_capacity);
    let dropped = client.dropped();
    hub.register(client).await?;
    tracing::info!(client_id = %id, user = %token.subject, "client registered");

    let remaining = (token.expires_at - tokens.now())
        .to_std()
        .unwrap_or(Duration::ZERO);
    let _guard = ClientGuard {
        id,
        hub: hub.clone(),
        writer: tokio::spawn(write_loop(Arc::clone(&conn), outbound)),
    };

    let result = tokio::select! {
        result = read_loop(&conn, &hub) => result,
        () = dropped.cancelled() => {
            tracing::info!(client_id = %id, "dropped by hub, closing");
            Ok(())
        }
        () = tokio::time::sleep(remaining) => {
            notify_expired(&conn).await;
            Ok(())
        }
    };

    if let Err(e) = conn.close().await {
        tracing::debug!(client_id = %id, error = %e, "close failed");
    }
    hub.unregister(id).await?;
    tracing::info!(client_id = %id, "client unregistered");
    result
}

/// Forwards every inbound frame to the hub, untouched.
async fn read_loop(conn: &WebSocketConnection, hub: &HubHandle) -> Result<(), DrawboardError> {
    let id = conn.id();
    loop {
        match conn.recv().await {
            Ok(Some(frame)) => hub.broadcast(Some(id), frame).await?,
            Ok(None) => {
                tracing::debug!(client_id = %id, "connection closed");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(client_id = %id, error = %e, "read failed");
                return Ok(());
            }
        }
    }
}

/// Drains the outbound queue onto the socket.
///
/// The queue closes when the hub drops the client (unregistered, or cut
/// off for being too slow); the socket is closed then too.
async fn write_loop(conn: Arc<WebSocketConnection>, mut outbound: mpsc::Receiver<Frame>) {
    let id = conn.id();
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(client_id = %id, error = %e, "write failed");
            break;
        }
    }
    let _ = conn.close().await;
}

/// Tells the client its token ran out.
///
/// The notice goes straight to the socket rather than through the queue so
/// a full queue can't hold it back. A writer stuck on a peer that stopped
/// reading can, so the notice is given up after [`NOTICE_TIMEOUT`].
async fn notify_expired(conn: &WebSocketConnection) {
    let id = conn.id();
    tracing::info!(client_id = %id, "access token expired, closing");
    let frame = match ControlFrame::TokenExpired.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(client_id = %id, error = %e, "could not encode expiry notice");
            return;
        }
    };
    match tokio::time::timeout(NOTICE_TIMEOUT, conn.send(&frame)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(client_id = %id, error = %e, "expiry notice not delivered"),
        Err(_) => tracing::debug!(client_id = %id, "expiry notice timed out"),
    }
}
