//! What the hub stores per connection, and what it fans out.

use drawboard_transport::{ConnectionId, Frame};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// A live connection as the hub sees it: an id and the sending half of
/// that connection's outbound queue.
///
/// The receiving half belongs to the connection's writer task. When the
/// hub drops a `Client`, the queue closes and the writer's `recv` returns
/// `None`, which is how the writer learns it's done. A writer stuck on
/// the socket never gets that far, so dropping also cancels the token
/// handed out by [`Client::dropped`].
#[derive(Debug)]
pub struct Client {
    id: ConnectionId,
    outbound: mpsc::Sender<Frame>,
    dropped: CancellationToken,
    _hangup: DropGuard,
}

impl Client {
    /// Creates a client with a fresh bounded queue of `capacity` frames.
    /// Returns the client (for the hub) and the receiver (for the writer).
    pub fn new(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let dropped = CancellationToken::new();
        let client = Self {
            id,
            outbound,
            _hangup: dropped.clone().drop_guard(),
            dropped,
        };
        (client, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Cancelled once this client is dropped, whether unregistered,
    /// displaced or cut off for a full queue.
    pub fn dropped(&self) -> CancellationToken {
        self.dropped.clone()
    }

    pub(crate) fn try_deliver(
        &self,
        frame: Frame,
    ) -> Result<(), mpsc::error::TrySendError<Frame>> {
        self.outbound.try_send(frame)
    }
}

/// A frame to fan out, tagged with the connection it came from (if any).
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub origin: Option<ConnectionId>,
    pub frame: Frame,
}
