//! The hub actor and its handle.
//!
//! The actor owns a `HashMap<ConnectionId, Client>` and nothing else can
//! reach it. Three bounded channels feed it (register, unregister,
//! broadcast) and one `select!` loop serves whichever has work, so the
//! three operations never interleave.

use std::collections::HashMap;

use drawboard_transport::{ConnectionId, Frame};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};

use crate::{Broadcast, Client, HubConfig, HubError};

/// A register request. The reply fires once the client is in the map, so
/// anything the caller broadcasts afterwards can reach it.
struct Register {
    client: Client,
    reply: oneshot::Sender<()>,
}

/// Handle to the running hub. Cheap to clone: a few channel senders and a
/// `watch` receiver.
///
/// The actor stops once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct HubHandle {
    register: mpsc::Sender<Register>,
    unregister: mpsc::Sender<ConnectionId>,
    broadcast: mpsc::Sender<Broadcast>,
    clients: watch::Receiver<usize>,
}

impl HubHandle {
    /// Adds a client to the hub, replacing any client with the same id.
    /// Returns once the hub has processed it.
    pub async fn register(&self, client: Client) -> Result<(), HubError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.register
            .send(Register {
                client,
                reply: reply_tx,
            })
            .await
            .map_err(|_| HubError::Unavailable)?;
        reply_rx.await.map_err(|_| HubError::Unavailable)
    }

    /// Removes a client and closes its outbound queue. A no-op if the
    /// client is already gone.
    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubError> {
        self.unregister
            .send(id)
            .await
            .map_err(|_| HubError::Unavailable)
    }

    /// Queues `frame` for delivery to every registered client
    /// (fire-and-forget). `origin` is the connection it came from, used
    /// to skip the sender when echo is off.
    pub async fn broadcast(
        &self,
        origin: Option<ConnectionId>,
        frame: Frame,
    ) -> Result<(), HubError> {
        self.broadcast
            .send(Broadcast { origin, frame })
            .await
            .map_err(|_| HubError::Unavailable)
    }

    /// Number of registered clients as of the actor's last step.
    pub fn client_count(&self) -> usize {
        *self.clients.borrow()
    }

    /// Waits until the hub reports exactly `count` registered clients.
    pub async fn wait_for_clients(&self, count: usize) -> Result<(), HubError> {
        let mut clients = self.clients.clone();
        clients
            .wait_for(|current| *current == count)
            .await
            .map(|_| ())
            .map_err(|_| HubError::Unavailable)
    }
}

/// The actor state. Lives inside its own Tokio task.
struct HubActor {
    clients: HashMap<ConnectionId, Client>,
    echo_to_sender: bool,
    register: mpsc::Receiver<Register>,
    unregister: mpsc::Receiver<ConnectionId>,
    broadcast: mpsc::Receiver<Broadcast>,
    count: watch::Sender<usize>,
}

impl HubActor {
    async fn run(mut self) {
        tracing::info!("hub started");

        loop {
            tokio::select! {
                Some(cmd) = self.register.recv() => self.handle_register(cmd),
                Some(id) = self.unregister.recv() => self.handle_unregister(id),
                Some(msg) = self.broadcast.recv() => self.handle_broadcast(msg),
                else => break,
            }
        }

        tracing::info!("hub stopped");
    }

    fn handle_register(&mut self, Register { client, reply }: Register) {
        let id = client.id();
        if self.clients.insert(id, client).is_some() {
            // The displaced client is dropped here, closing its queue.
            tracing::debug!(client_id = %id, "replaced client with the same id");
        }
        tracing::info!(client_id = %id, clients = self.clients.len(), "client registered");
        self.publish_count();
        let _ = reply.send(());
    }

    fn handle_unregister(&mut self, id: ConnectionId) {
        if self.clients.remove(&id).is_some() {
            tracing::info!(client_id = %id, clients = self.clients.len(), "client unregistered");
            self.publish_count();
        }
    }

    fn handle_broadcast(&mut self, Broadcast { origin, frame }: Broadcast) {
        let echo = self.echo_to_sender;
        self.clients.retain(|id, client| {
            if !echo && origin == Some(*id) {
                return true;
            }
            match client.try_deliver(frame.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(client_id = %id, "outbound queue full, dropping client");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(client_id = %id, "writer gone, dropping client");
                    false
                }
            }
        });
        self.publish_count();
    }

    /// Pushes the current client count to `watch` subscribers, waking
    /// them only when it changed.
    fn publish_count(&self) {
        let len = self.clients.len();
        self.count.send_if_modified(|count| {
            if *count == len {
                return false;
            }
            *count = len;
            true
        });
    }
}

/// Spawns the hub actor and returns a handle to it.
pub fn spawn_hub(config: HubConfig) -> HubHandle {
    let capacity = config.command_capacity.max(1);
    let (register_tx, register_rx) = mpsc::channel(capacity);
    let (unregister_tx, unregister_rx) = mpsc::channel(capacity);
    let (broadcast_tx, broadcast_rx) = mpsc::channel(capacity);
    let (count_tx, count_rx) = watch::channel(0);

    let actor = HubActor {
        clients: HashMap::new(),
        echo_to_sender: config.echo_to_sender,
        register: register_rx,
        unregister: unregister_rx,
        broadcast: broadcast_rx,
        count: count_tx,
    };
    tokio::spawn(actor.run());

    HubHandle {
        register: register_tx,
        unregister: unregister_tx,
        broadcast: broadcast_tx,
        clients: count_rx,
    }
}
