//! # Drawboard
//!
//! Server for a shared, realtime drawing board.
//!
//! Clients sign in over HTTP and get a short-lived access token plus a
//! rotating refresh cookie. With the access token they open a WebSocket on
//! the realtime listener; every frame a client sends is fanned out,
//! untouched, to every connected client. When the token runs out the
//! server says so (`{"type":"TOKEN_EXPIRED"}`) and hangs up.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drawboard::prelude::*;
//!
//! # async fn start() -> Result<(), DrawboardError> {
//! let server = DrawboardServer::builder()
//!     .realtime_addr("0.0.0.0:8081")
//!     .http_addr("0.0.0.0:8080")
//!     .auth_config(AuthConfig::with_secret("change-me"))
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod api;
mod config;
mod error;
mod gate;
mod handler;
mod server;

pub use api::{AppState, router};
pub use config::ServerConfig;
pub use error::DrawboardError;
pub use gate::{REALTIME_PATH, TokenGate};
pub use handler::handle_connection;
pub use server::{DrawboardServer, DrawboardServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{DrawboardError, DrawboardServer, DrawboardServerBuilder, ServerConfig};
    pub use drawboard_auth::{AuthConfig, Clock, ManualClock, SystemClock, TokenService};
    pub use drawboard_hub::{HubConfig, HubHandle};
    pub use drawboard_session::{DocumentStore, MemoryStore};
}
