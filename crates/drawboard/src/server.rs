//! `DrawboardServer` builder and server loop.
//!
//! This is the entry point for running a drawboard. It ties the layers
//! together: transport → hub for the realtime side, session → auth for the
//! HTTP side, with one [`TokenService`] shared by both.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use drawboard_auth::{AuthGateway, Clock, SystemClock, TokenService};
use drawboard_hub::{HubHandle, spawn_hub};
use drawboard_session::{DocumentStore, EventArchive, MemoryStore};
use drawboard_transport::{Handshake, Transport, TransportError, WebSocketTransport};
use tokio::net::TcpListener;

use crate::api::{AppState, router};
use crate::gate::TokenGate;
use crate::handler::handle_connection;
use crate::{DrawboardError, ServerConfig};

/// Builder for configuring and starting a drawboard server.
///
/// # Example
///
/// ```rust,no_run
/// use drawboard::prelude::*;
///
/// # async fn start() -> Result<(), DrawboardError> {
/// let server = DrawboardServer::builder()
///     .http_addr("0.0.0.0:8080")
///     .realtime_addr("0.0.0.0:8081")
///     .auth_config(AuthConfig::with_secret("change-me"))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct DrawboardServerBuilder {
    config: ServerConfig,
    clock: Arc<dyn Clock>,
}

impl DrawboardServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(ServerConfig::default())
    }

    /// Starts from a complete configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn http_addr(mut self, addr: &str) -> Self {
        self.config.http_addr = addr.to_string();
        self
    }

    pub fn realtime_addr(mut self, addr: &str) -> Self {
        self.config.realtime_addr = addr.to_string();
        self
    }

    /// Sets the signing secret, issuer and token lifetimes.
    pub fn auth_config(mut self, config: drawboard_auth::AuthConfig) -> Self {
        self.config.auth = config;
        self
    }

    /// Sets the hub's queue sizes and echo behaviour.
    pub fn hub_config(mut self, config: drawboard_hub::HubConfig) -> Self {
        self.config.hub = config;
        self
    }

    /// Replaces the wall clock used for token issue and expiry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Binds both listeners and starts the hub, keeping everything in memory.
    pub async fn build(self) -> Result<DrawboardServer<MemoryStore>, DrawboardError> {
        self.build_with_store(MemoryStore::new()).await
    }

    /// Binds both listeners and starts the hub on top of `store`.
    pub async fn build_with_store<S>(self, store: S) -> Result<DrawboardServer<S>, DrawboardError>
    where
        S: DocumentStore + Clone,
    {
        let ServerConfig {
            http_addr,
            realtime_addr,
            auth,
            hub,
        } = self.config;

        let transport = WebSocketTransport::bind(&realtime_addr).await?;
        let http = TcpListener::bind(&http_addr).await?;
        tracing::info!(addr = %http_addr, "HTTP API listening");

        let tokens = TokenService::with_clock(&auth, self.clock);
        let gateway = AuthGateway::new(store.clone(), tokens.clone(), auth);

        Ok(DrawboardServer {
            transport,
            http,
            hub: spawn_hub(hub),
            outbound_capacity: hub.outbound_capacity,
            tokens,
            state: AppState {
                gateway: Arc::new(gateway),
                archive: EventArchive::new(store),
            },
        })
    }
}

impl Default for DrawboardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound drawboard server.
///
/// Call [`run()`](Self::run) to start serving both listeners.
pub struct DrawboardServer<S> {
    transport: WebSocketTransport,
    http: TcpListener,
    hub: HubHandle,
    outbound_capacity: usize,
    tokens: TokenService,
    state: AppState<S>,
}

impl DrawboardServer<MemoryStore> {
    /// Creates a new builder.
    pub fn builder() -> DrawboardServerBuilder {
        DrawboardServerBuilder::new()
    }
}

impl<S: DocumentStore + Clone> DrawboardServer<S> {
    /// Address of the realtime (WebSocket) listener.
    pub fn realtime_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Address of the HTTP API listener.
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    /// A handle to the running hub.
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    pub fn gateway(&self) -> &AuthGateway<S> {
        &self.state.gateway
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Serves the HTTP API and the realtime endpoint until the HTTP server
    /// fails or the process is terminated.
    pub async fn run(self) -> Result<(), DrawboardError> {
        let Self {
            transport,
            http,
            hub,
            outbound_capacity,
            tokens,
            state,
        } = self;
        tracing::info!("drawboard server running");

        let api = axum::serve(http, router(state)).into_future();
        let realtime = accept_loop(transport, hub, tokens, outbound_capacity);

        tokio::select! {
            result = api => {
                result?;
                Ok(())
            }
            () = realtime => Ok(()),
        }
    }
}

/// Accepts realtime connections forever, one task per peer.
///
/// Only the TCP accept happens here. Each peer's upgrade and gate check
/// run on its own task, so a peer that never finishes the handshake
/// holds up nobody else.
async fn accept_loop(
    mut transport: WebSocketTransport,
    hub: HubHandle,
    tokens: TokenService,
    outbound_capacity: usize,
) {
    let gate = Arc::new(TokenGate::new(tokens.clone()));
    loop {
        let pending = match transport.accept().await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
                continue;
            }
        };
        let gate = Arc::clone(&gate);
        let hub = hub.clone();
        let tokens = tokens.clone();
        tokio::spawn(async move {
            let addr = pending.peer_addr();
            let (conn, token) = match pending.upgrade(gate.as_ref()).await {
                Ok(admitted) => admitted,
                // Already logged at debug by the transport.
                Err(TransportError::Refused { .. }) => return,
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "upgrade failed");
                    return;
                }
            };
            if let Err(e) = handle_connection(conn, token, hub, tokens, outbound_capacity).await {
                tracing::debug!(error = %e, "connection ended with error");
            }
        });
    }
}
