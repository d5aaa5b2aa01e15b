//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::{
    Connection, ConnectionId, Frame, Gatekeeper, Handshake, Refusal, Transport,
    TransportError, UpgradeRequest,
};

/// How long a client gets to finish the HTTP upgrade.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `close` waits to flush the close frame to a peer that isn't
/// reading before giving up on the close handshake.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Pending = WebSocketHandshake;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<WebSocketHandshake, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(WebSocketHandshake { stream, addr })
    }
}

/// A TCP peer that hasn't sent its upgrade request yet.
pub struct WebSocketHandshake {
    stream: TcpStream,
    addr: SocketAddr,
}

impl WebSocketHandshake {
    /// Address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Handshake for WebSocketHandshake {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn upgrade<G: Gatekeeper>(
        self,
        gate: &G,
    ) -> Result<(Self::Connection, G::Grant), Self::Error> {
        let Self { stream, addr } = self;

        // The gate runs inside the handshake callback, so a refused
        // request is answered with an HTTP error and never upgraded.
        let mut verdict: Option<Result<G::Grant, Refusal>> = None;
        let callback = |req: &Request, resp: Response| {
            let view = UpgradeRequest::new(
                req.uri().path(),
                req.uri().query().map(str::to_owned),
                req.headers()
                    .get(AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned),
            );
            match gate.admit(&view) {
                Ok(grant) => {
                    verdict = Some(Ok(grant));
                    Ok(resp)
                }
                Err(refusal) => {
                    verdict = Some(Err(refusal));
                    Err(refusal_response(refusal))
                }
            }
        };

        let handshake = tokio::time::timeout(
            HANDSHAKE_TIMEOUT,
            tokio_tungstenite::accept_hdr_async(stream, callback),
        )
        .await;

        let ws = match handshake {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => {
                if let Some(Err(refusal)) = verdict {
                    tracing::debug!(%addr, status = refusal.status, "upgrade refused");
                    return Err(TransportError::Refused {
                        status: refusal.status,
                        reason: refusal.reason,
                    });
                }
                return Err(TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                )));
            }
            Err(_) => {
                tracing::debug!(%addr, "handshake timed out");
                return Err(TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "handshake timed out",
                )));
            }
        };

        let Some(Ok(grant)) = verdict else {
            return Err(TransportError::AcceptFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "handshake completed without admission",
            )));
        };

        let id = ConnectionId::generate();
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        Ok((WebSocketConnection::new(id, ws), grant))
    }
}

fn refusal_response(refusal: Refusal) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(refusal.reason.to_string()));
    *response.status_mut() =
        StatusCode::from_u16(refusal.status).unwrap_or(StatusCode::UNAUTHORIZED);
    response
}

/// A single WebSocket connection.
///
/// The socket is split into independent read and write halves, each
/// behind its own lock, so a reader parked in `recv` never holds up a
/// writer. Closing is signalled through a `watch` flag that also wakes a
/// pending `recv` and abandons a `send` stuck on a peer that stopped
/// reading.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
    closed: watch::Sender<bool>,
}

impl WebSocketConnection {
    fn new(id: ConnectionId, ws: WsStream) -> Self {
        let (sink, stream) = ws.split();
        let (closed, _) = watch::channel(false);
        Self {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed,
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, frame: &Frame) -> Result<(), Self::Error> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(TransportError::ConnectionClosed(
                "closed locally".into(),
            ));
        }
        let msg = match frame {
            Frame::Text(text) => Message::text(text.to_string()),
            Frame::Binary(data) => Message::binary(data.to_vec()),
        };
        let write = async { self.sink.lock().await.send(msg).await };
        tokio::select! {
            result = write => result.map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            }),
            () = wait_closed(&mut closed) => Err(TransportError::ConnectionClosed(
                "closed locally".into(),
            )),
        }
    }

    async fn recv(&self) -> Result<Option<Frame>, Self::Error> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Ok(None);
        }

        let mut stream = self.stream.lock().await;
        loop {
            let msg = tokio::select! {
                msg = stream.next() => msg,
                () = wait_closed(&mut closed) => return Ok(None),
            };
            match msg {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(Frame::from(text.as_str())));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(Frame::from(data.to_vec())));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if self.closed.send_replace(true) {
            return Ok(());
        }
        let closing = async { self.sink.lock().await.close().await };
        let Ok(result) = tokio::time::timeout(CLOSE_TIMEOUT, closing).await else {
            tracing::debug!(id = %self.id, "peer not reading, skipped close handshake");
            return Ok(());
        };
        match result {
            Ok(()) => Ok(()),
            // The peer beat us to it; the socket is closed either way.
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed | WsError::Io(_)) => {
                tracing::debug!(id = %self.id, "close on already broken socket");
                Ok(())
            }
            Err(e) => Err(TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))),
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Resolves once the close flag flips to `true` (or its sender is gone).
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    while !*closed.borrow_and_update() {
        if closed.changed().await.is_err() {
            return;
        }
    }
}
