//! Handshake gate: decides whether an upgrade request becomes a connection.
//!
//! The transport doesn't know anything about tokens or users. It hands the
//! parts of the HTTP upgrade request that matter to a [`Gatekeeper`], and
//! either completes the upgrade (keeping whatever the gate granted) or
//! answers with the gate's [`Refusal`] status and never opens the socket.

/// The parts of an HTTP upgrade request a gate may inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeRequest {
    path: String,
    query: Option<String>,
    authorization: Option<String>,
}

impl UpgradeRequest {
    /// Builds a request view from its parts.
    pub fn new(
        path: impl Into<String>,
        query: Option<String>,
        authorization: Option<String>,
    ) -> Self {
        Self {
            path: path.into(),
            query,
            authorization,
        }
    }

    /// The request path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the first value of the query parameter `name`.
    ///
    /// Values are taken as-is; the tokens this is used for are already
    /// URL-safe.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .as_deref()?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Returns the token from an `Authorization: Bearer <token>` header.
    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization
            .as_deref()?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Why an upgrade was refused. Sent back as the HTTP response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refusal {
    /// HTTP status code.
    pub status: u16,
    /// Short, fixed reason used as the response body.
    pub reason: &'static str,
}

impl Refusal {
    /// 401: missing, invalid or expired credentials.
    pub const fn unauthorized() -> Self {
        Self {
            status: 401,
            reason: "unauthorized",
        }
    }

    /// 404: the upgrade was aimed at a path nobody serves.
    pub const fn not_found() -> Self {
        Self {
            status: 404,
            reason: "not found",
        }
    }
}

/// Admits or refuses upgrade requests.
///
/// Runs synchronously inside the handshake, so implementations must not
/// do I/O. Verifying a signed token fits; a database lookup does not.
pub trait Gatekeeper: Send + Sync + 'static {
    /// What a successful admission yields (e.g. the verified identity).
    type Grant: Send + 'static;

    /// Inspects the request and either admits it or refuses it.
    fn admit(&self, request: &UpgradeRequest) -> Result<Self::Grant, Refusal>;
}

/// Admits every request. Useful for tests and local tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Gatekeeper for AllowAll {
    type Grant = ();

    fn admit(&self, _request: &UpgradeRequest) -> Result<(), Refusal> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_finds_token() {
        let req = UpgradeRequest::new("/ws", Some("a=1&token=abc.def".into()), None);
        assert_eq!(req.query_param("token"), Some("abc.def"));
        assert_eq!(req.query_param("a"), Some("1"));
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn test_query_param_without_query_is_none() {
        let req = UpgradeRequest::new("/ws", None, None);
        assert_eq!(req.query_param("token"), None);
    }

    #[test]
    fn test_bearer_token_parses_header() {
        let req = UpgradeRequest::new("/ws", None, Some("Bearer xyz".into()));
        assert_eq!(req.bearer_token(), Some("xyz"));

        let basic = UpgradeRequest::new("/ws", None, Some("Basic xyz".into()));
        assert_eq!(basic.bearer_token(), None);

        let empty = UpgradeRequest::new("/ws", None, Some("Bearer ".into()));
        assert_eq!(empty.bearer_token(), None);
    }

    #[test]
    fn test_allow_all_admits() {
        let req = UpgradeRequest::default();
        assert!(AllowAll.admit(&req).is_ok());
    }
}
