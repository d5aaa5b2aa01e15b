//! Server configuration.

use drawboard_auth::AuthConfig;
use drawboard_hub::HubConfig;

/// Everything a [`DrawboardServer`](crate::DrawboardServer) needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listener for signup/signin/refresh/events (default `127.0.0.1:8080`).
    pub http_addr: String,
    /// Listener for the realtime WebSocket (default `127.0.0.1:8081`).
    pub realtime_addr: String,
    pub auth: AuthConfig,
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8080".to_string(),
            realtime_addr: "127.0.0.1:8081".to_string(),
            auth: AuthConfig::default(),
            hub: HubConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Sets the HTTP listener address.
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the realtime (WebSocket) listener address.
    pub fn realtime_addr(mut self, addr: impl Into<String>) -> Self {
        self.realtime_addr = addr.into();
        self
    }

    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn hub(mut self, hub: HubConfig) -> Self {
        self.hub = hub;
        self
    }
}
