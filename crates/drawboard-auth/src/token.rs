//! HS256 access tokens and opaque refresh tokens.
//!
//! Access tokens are JWTs carrying `{sub, iss, iat, exp}`. They're checked
//! against the service's own [`Clock`] rather than the wall clock, so a
//! test can move time forward and watch a token expire.
//!
//! Refresh tokens are random bytes, base64url encoded. They're handed to
//! the client once and only their SHA-256 is ever stored.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use drawboard_session::TokenHash;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::{AuthConfig, Clock, SystemClock, TokenError};

/// Refresh token length in random bytes. Encodes to 43 characters.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Claims embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user id.
    pub sub: String,
    pub iss: String,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
}

/// What a successfully verified access token proves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies tokens.
///
/// Cheap to clone; clones share the keys and the clock.
#[derive(Clone)]
pub struct TokenService {
    inner: Arc<Keys>,
    clock: Arc<dyn Clock>,
}

struct Keys {
    secret_is_empty: bool,
    issuer: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    /// A token service on the system clock.
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            inner: Arc::new(Keys {
                secret_is_empty: secret.is_empty(),
                issuer: config.issuer.clone(),
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
            }),
            clock,
        }
    }

    /// The current time according to this service's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Signs an access token for `subject` that expires at `expires_at`.
    ///
    /// # Errors
    /// [`TokenError::Signing`] if the secret is empty or encoding fails.
    pub fn issue_access_token(
        &self,
        subject: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if self.inner.secret_is_empty {
            return Err(TokenError::Signing("signing secret is empty".into()));
        }
        let claims = AccessClaims {
            sub: subject.to_string(),
            iss: self.inner.issuer.clone(),
            iat: self.now().timestamp(),
            exp: expires_at.timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.inner.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies signature, algorithm, issuer, and expiry.
    ///
    /// The header's `alg` is checked before anything else: only HS256 is
    /// accepted, whatever the token claims. Expiry has no leeway; a token
    /// whose `exp` equals the current second is already expired.
    pub fn verify_access_token(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| TokenError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::HS256 {
            return Err(TokenError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against our clock, not jsonwebtoken's.
        validation.validate_exp = false;
        validation.set_issuer(&[self.inner.issuer.as_str()]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

        let claims = jsonwebtoken::decode::<AccessClaims>(token, &self.inner.decoding, &validation)
            .map_err(|e| TokenError::InvalidToken(e.to_string()))?
            .claims;

        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| TokenError::InvalidToken("exp out of range".into()))?;
        if expires_at <= self.now() {
            return Err(TokenError::ExpiredToken);
        }

        Ok(VerifiedToken {
            subject: claims.sub,
            expires_at,
        })
    }

    /// Mints a fresh refresh token of [`REFRESH_TOKEN_BYTES`] random bytes.
    pub fn issue_refresh_token(&self) -> Result<String, TokenError> {
        generate_refresh_token(REFRESH_TOKEN_BYTES)
    }

    /// SHA-256 of a refresh token, as stored in the session row.
    pub fn hash_refresh_token(&self, token: &str) -> TokenHash {
        TokenHash::digest(token)
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.inner.issuer)
            .finish_non_exhaustive()
    }
}

/// `byte_length` bytes from the OS random source, base64url without
/// padding.
///
/// # Errors
/// [`TokenError::Entropy`] if the OS source fails.
pub fn generate_refresh_token(byte_length: usize) -> Result<String, TokenError> {
    let mut bytes = vec![0u8; byte_length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TokenError::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
