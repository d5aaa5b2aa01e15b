//! Transport abstraction layer for the shared drawboard.
//!
//! Provides the [`Transport`], [`Handshake`] and [`Connection`] traits
//! that abstract over the realtime socket, plus the [`Gatekeeper`] hook
//! that decides whether an upgrade request is let through at all.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod frame;
mod gate;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use frame::Frame;
pub use gate::{AllowAll, Gatekeeper, Refusal, UpgradeRequest};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketHandshake, WebSocketTransport};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// Process-wide counter feeding the monotonic half of [`ConnectionId`].
static NEXT_CONNECTION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
///
/// Made of a monotonic sequence number plus 64 random bits, so ids stay
/// unique under heavy connection churn and can't be guessed from the
/// order in which clients arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    seq: u64,
    nonce: u64,
}

impl ConnectionId {
    /// Creates a `ConnectionId` from its raw parts.
    pub fn new(seq: u64, nonce: u64) -> Self {
        Self { seq, nonce }
    }

    /// Allocates a fresh id: next sequence number, new random nonce.
    pub fn generate() -> Self {
        let seq = NEXT_CONNECTION_SEQ.fetch_add(1, Ordering::Relaxed);
        let nonce: u64 = rand::rng().random();
        Self { seq, nonce }
    }

    /// Returns the monotonic part of the id.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}-{:016x}", self.seq, self.nonce)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// An accepted peer whose upgrade hasn't run yet.
    type Pending: Handshake<Connection = Self::Connection, Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming peer.
    ///
    /// Returns as soon as the peer is accepted, before anything is read
    /// from it, so a silent peer can't hold up the next `accept`. Finish
    /// the upgrade with [`Handshake::upgrade`], normally on its own task.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;
}

/// An accepted peer waiting for its upgrade handshake.
pub trait Handshake: Send + 'static {
    /// The connection type produced by a completed upgrade.
    type Connection: Connection;
    /// The error type for the upgrade.
    type Error: std::error::Error + Send + Sync;

    /// Runs the upgrade request through `gate` and completes the
    /// handshake.
    ///
    /// Returns the connection together with whatever the gate granted
    /// (e.g. the verified identity behind the presented token).
    async fn upgrade<G: Gatekeeper>(
        self,
        gate: &G,
    ) -> Result<(Self::Connection, G::Grant), Self::Error>;
}

/// A single connection that can send and receive frames.
///
/// Implementations must allow `send` and `recv` to run concurrently from
/// different tasks: a pending `recv` never blocks a `send`.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends a frame to the remote peer.
    async fn send(&self, frame: &Frame) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is closed, either by the
    /// peer or locally through [`close`](Self::close).
    async fn recv(&self) -> Result<Option<Frame>, Self::Error>;

    /// Closes the connection. A `send` still waiting on the peer gives up
    /// with an error. Closing an already-closed connection is a no-op and
    /// returns `Ok(())`.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_seq() {
        let id = ConnectionId::new(42, 7);
        assert_eq!(id.seq(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7, 0xab);
        assert_eq!(id.to_string(), "conn-7-00000000000000ab");
    }

    #[test]
    fn test_connection_id_equality_includes_nonce() {
        let a = ConnectionId::new(1, 10);
        let b = ConnectionId::new(1, 10);
        let c = ConnectionId::new(1, 11);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_connection_id_generate_is_monotonic_and_unique() {
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();
        assert!(b.seq() > a.seq());
        assert_ne!(a, b);
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1, 1), "alice");
        map.insert(ConnectionId::new(2, 2), "bob");
        assert_eq!(map[&ConnectionId::new(1, 1)], "alice");
    }
}
