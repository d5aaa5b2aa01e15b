//! Signup, signin, and refresh.
//!
//! Each flow is a short sequence of store calls with no locks held in
//! between; the store's own uniqueness rules (one account per email, one
//! session per user) are what keep concurrent requests honest.

use chrono::{DateTime, Utc};
use drawboard_session::{DocumentStore, SessionStore, SessionTimes, StoreError, User};
use serde::Serialize;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{Argon2Hasher, AuthConfig, AuthError, PasswordHasher, TokenService};

/// Hashed once on first use and verified against when an email is
/// unknown, so a miss costs about as much as a wrong password.
const DUMMY_PASSWORD: &str = "drawboard-timing-equalizer";

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SigninInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RefreshInput {
    /// The (still valid) access token the client currently holds.
    pub access_token: String,
    /// The raw refresh token from the client's cookie.
    pub refresh_token: String,
}

/// The public face of a user. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Result of a successful signin.
#[derive(Debug, Clone)]
pub struct SigninOutput {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    /// Raw refresh token. Goes to the client once; only its hash is kept.
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: UserView,
}

/// Result of a successful refresh: a brand new token pair.
#[derive(Debug, Clone)]
pub struct RefreshOutput {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// AuthGateway
// ---------------------------------------------------------------------------

/// Orchestrates the three auth flows over a [`DocumentStore`].
///
/// Generic over the store and the hasher so this crate never depends on a
/// particular backend.
pub struct AuthGateway<S, H = Argon2Hasher> {
    store: S,
    sessions: SessionStore<S>,
    tokens: TokenService,
    hasher: H,
    config: AuthConfig,
    dummy_hash: OnceCell<String>,
}

impl<S: DocumentStore + Clone> AuthGateway<S, Argon2Hasher> {
    /// A gateway using Argon2id for passwords.
    pub fn new(store: S, tokens: TokenService, config: AuthConfig) -> Self {
        Self::with_hasher(store, tokens, config, Argon2Hasher)
    }
}

impl<S: DocumentStore + Clone, H: PasswordHasher> AuthGateway<S, H> {
    pub fn with_hasher(store: S, tokens: TokenService, config: AuthConfig, hasher: H) -> Self {
        Self {
            sessions: SessionStore::new(store.clone()),
            store,
            tokens,
            hasher,
            config,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn sessions(&self) -> &SessionStore<S> {
        &self.sessions
    }

    /// Registers a new account and returns its id.
    ///
    /// # Errors
    /// - [`AuthError::Validation`] for an empty name or password, or an
    ///   email without `@`.
    /// - [`AuthError::Conflict`] if the normalized email is taken.
    pub async fn signup(&self, input: SignupInput) -> Result<Uuid, AuthError> {
        let name = input.name.trim().to_string();
        let email = User::normalize_email(&input.email);
        if name.is_empty() {
            return Err(AuthError::Validation("name is required".into()));
        }
        if input.password.is_empty() {
            return Err(AuthError::Validation("password is required".into()));
        }
        if !email.contains('@') {
            return Err(AuthError::Validation("email is invalid".into()));
        }

        // The plaintext moves into the blocking task and is dropped there.
        let password_hash = self.hash_password(input.password).await?;

        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
        };
        let id = user.id;
        match self.store.insert_user(user).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Err(AuthError::Conflict),
            Err(e) => return Err(AuthError::internal("insert user", e)),
        }

        tracing::info!(user_id = %id, "user signed up");
        Ok(id)
    }

    /// Checks credentials and starts a fresh refresh session, replacing any
    /// session the user had.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] for an unknown email or a wrong
    /// password; the two are indistinguishable to the caller.
    pub async fn signin(&self, input: SigninInput) -> Result<SigninOutput, AuthError> {
        let email = User::normalize_email(&input.email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await
            .map_err(|e| AuthError::internal("find user", e))?;

        let Some(user) = user else {
            let dummy = self.dummy_hash().await?;
            let _ = self.verify_password(input.password, dummy).await;
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .verify_password(input.password, user.password_hash.clone())
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        let now = self.tokens.now();
        let access_expires_at = expiry_after(now, self.config.access_ttl)?;
        expiry_after(now, self.config.refresh_ttl)?;
        let access_token = self
            .tokens
            .issue_access_token(&user.id.to_string(), access_expires_at)
            .map_err(|e| AuthError::internal("issue access token", e))?;
        let refresh_token = self
            .tokens
            .issue_refresh_token()
            .map_err(|e| AuthError::internal("issue refresh token", e))?;

        let times = SessionTimes::starting_at(now, self.config.refresh_ttl);
        self.sessions
            .clear_and_create(user.id, self.tokens.hash_refresh_token(&refresh_token), times)
            .await?;

        tracing::info!(user_id = %user.id, "user signed in");
        Ok(SigninOutput {
            access_token,
            access_expires_at,
            refresh_token,
            refresh_expires_at: times.expires_at,
            user: UserView::from(&user),
        })
    }

    /// Rotates the refresh session and issues a new token pair.
    ///
    /// The access token must still verify: it's what names the user. The
    /// refresh token must hash to the live session's hash, and that
    /// session must not have expired. Any failure leaves the stored
    /// session untouched.
    ///
    /// # Errors
    /// [`AuthError::Unauthorized`] for every token or session problem.
    pub async fn refresh(&self, input: RefreshInput) -> Result<RefreshOutput, AuthError> {
        let verified = self
            .tokens
            .verify_access_token(&input.access_token)
            .map_err(|e| {
                tracing::debug!(error = %e, "refresh with unusable access token");
                AuthError::Unauthorized
            })?;
        let user_id = Uuid::parse_str(&verified.subject).map_err(|_| AuthError::Unauthorized)?;

        let now = self.tokens.now();
        let presented = self.tokens.hash_refresh_token(&input.refresh_token);
        let session = self
            .sessions
            .current(user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        if session.token_hash != presented || session.is_expired(now) {
            tracing::debug!(%user_id, "refresh token rejected");
            return Err(AuthError::Unauthorized);
        }

        let access_expires_at = expiry_after(now, self.config.access_ttl)?;
        let refresh_expires_at = expiry_after(now, self.config.refresh_ttl)?;
        let access_token = self
            .tokens
            .issue_access_token(&verified.subject, access_expires_at)
            .map_err(|e| AuthError::internal("issue access token", e))?;
        let refresh_token = self
            .tokens
            .issue_refresh_token()
            .map_err(|e| AuthError::internal("issue refresh token", e))?;

        // Only succeeds while the row still holds `presented`, so a replayed
        // cookie racing this call loses.
        self.sessions
            .rotate(
                user_id,
                &presented,
                self.tokens.hash_refresh_token(&refresh_token),
                now,
                self.config.refresh_ttl,
            )
            .await?;

        tracing::info!(%user_id, "refresh session rotated");
        Ok(RefreshOutput {
            access_token,
            access_expires_at,
            refresh_token,
            refresh_expires_at,
        })
    }

    // -- password helpers ---------------------------------------------------

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::internal("hash password", e))?
            .map_err(|e| AuthError::internal("hash password", e))
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::internal("verify password", e))?
            .map_err(|e| AuthError::internal("verify password", e))
    }

    async fn dummy_hash(&self) -> Result<String, AuthError> {
        self.dummy_hash
            .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD.to_string()))
            .await
            .cloned()
    }
}

/// `now + ttl`, or an internal error if that falls off the calendar.
fn expiry_after(now: DateTime<Utc>, ttl: chrono::Duration) -> Result<DateTime<Utc>, AuthError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AuthError::internal("compute expiry", format!("ttl {ttl} out of range")))
}
