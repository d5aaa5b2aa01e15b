//! Handshake gate for the realtime endpoint.

use drawboard_auth::{TokenService, VerifiedToken};
use drawboard_transport::{Gatekeeper, Refusal, UpgradeRequest};

/// The only path the realtime listener upgrades.
pub const REALTIME_PATH: &str = "/ws";

/// Lets a WebSocket upgrade through only with a valid, unexpired access
/// token.
///
/// The token is read from `?token=` first and from an
/// `Authorization: Bearer` header otherwise. Missing or bad tokens are
/// refused with 401; any path other than [`REALTIME_PATH`] with 404.
#[derive(Debug, Clone)]
pub struct TokenGate {
    tokens: TokenService,
}

impl TokenGate {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }
}

impl Gatekeeper for TokenGate {
    type Grant = VerifiedToken;

    fn admit(&self, request: &UpgradeRequest) -> Result<VerifiedToken, Refusal> {
        if request.path() != REALTIME_PATH {
            return Err(Refusal::not_found());
        }
        let token = request
            .query_param("token")
            .filter(|token| !token.is_empty())
            .or_else(|| request.bearer_token())
            .ok_or(Refusal::unauthorized())?;

        self.tokens.verify_access_token(token).map_err(|e| {
            tracing::debug!(error = %e, "realtime upgrade with unusable token");
            Refusal::unauthorized()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use drawboard_auth::AuthConfig;

    fn gate() -> (TokenGate, String) {
        let tokens = TokenService::new(&AuthConfig::with_secret("gate-secret"));
        let token = tokens
            .issue_access_token("user-1", Utc::now() + Duration::minutes(5))
            .unwrap();
        (TokenGate::new(tokens), token)
    }

    #[test]
    fn test_admit_query_token() {
        let (gate, token) = gate();
        let request = UpgradeRequest::new("/ws", Some(format!("token={token}")), None);
        let granted = gate.admit(&request).unwrap();
        assert_eq!(granted.subject, "user-1");
    }

    #[test]
    fn test_admit_bearer_header() {
        let (gate, token) = gate();
        let request = UpgradeRequest::new("/ws", None, Some(format!("Bearer {token}")));
        assert!(gate.admit(&request).is_ok());
    }

    #[test]
    fn test_admit_without_token_is_401() {
        let (gate, _) = gate();
        let request = UpgradeRequest::new("/ws", None, None);
        assert_eq!(gate.admit(&request).unwrap_err(), Refusal::unauthorized());
    }

    #[test]
    fn test_admit_bad_token_is_401() {
        let (gate, _) = gate();
        let request = UpgradeRequest::new("/ws", Some("token=garbage".into()), None);
        assert_eq!(gate.admit(&request).unwrap_err(), Refusal::unauthorized());
    }

    #[test]
    fn test_admit_expired_token_is_401() {
        let tokens = TokenService::new(&AuthConfig::with_secret("gate-secret"));
        let token = tokens
            .issue_access_token("user-1", Utc::now() - Duration::seconds(1))
            .unwrap();
        let request = UpgradeRequest::new("/ws", Some(format!("token={token}")), None);
        assert_eq!(
            TokenGate::new(tokens).admit(&request).unwrap_err(),
            Refusal::unauthorized()
        );
    }

    #[test]
    fn test_admit_other_path_is_404() {
        let (gate, token) = gate();
        let request = UpgradeRequest::new("/chat", Some(format!("token={token}")), None);
        assert_eq!(gate.admit(&request).unwrap_err(), Refusal::not_found());
    }
}
