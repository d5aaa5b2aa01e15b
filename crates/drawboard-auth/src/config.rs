//! Authentication configuration.

use std::fmt;

use chrono::Duration;

/// Issuer written into, and required from, every access token.
pub const DEFAULT_ISSUER: &str = "shared-drawboard";

/// Settings for token issuance and session lifetime.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret for HS256 signing. Must not be empty.
    pub jwt_secret: String,
    /// `iss` claim (default: `"shared-drawboard"`).
    pub issuer: String,
    /// Access token lifetime (default: 15 minutes).
    pub access_ttl: Duration,
    /// Refresh session lifetime (default: 7 days).
    pub refresh_ttl: Duration,
}

impl AuthConfig {
    /// Defaults with the given signing secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            ..Self::default()
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: DEFAULT_ISSUER.into(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }
}

// The secret stays out of logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lifetimes() {
        let config = AuthConfig::default();
        assert_eq!(config.access_ttl.num_seconds(), 900);
        assert_eq!(config.refresh_ttl.num_seconds(), 604_800);
        assert_eq!(config.issuer, "shared-drawboard");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = AuthConfig::with_secret("hunter2");
        let printed = format!("{config:?}");
        assert!(!printed.contains("hunter2"));
    }
}
