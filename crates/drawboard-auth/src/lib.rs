//! Authentication for the shared drawboard.
//!
//! Three pieces, leaves first:
//!
//! - [`TokenService`]: signs and verifies short-lived access tokens and
//!   mints opaque refresh tokens. No I/O; its answers depend only on the
//!   secret and the injected [`Clock`].
//! - [`PasswordHasher`]: salted, one-way password hashing, with
//!   [`Argon2Hasher`] as the implementation.
//! - [`AuthGateway`]: the signup, signin, and refresh flows, built on the
//!   two above plus a [`SessionStore`](drawboard_session::SessionStore).

mod clock;
mod config;
mod error;
mod gateway;
mod password;
mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AuthConfig;
pub use error::{AuthError, PasswordError, TokenError};
pub use gateway::{
    AuthGateway, RefreshInput, RefreshOutput, SigninInput, SigninOutput,
    SignupInput, UserView,
};
pub use password::{Argon2Hasher, PasswordHasher};
pub use token::{
    AccessClaims, REFRESH_TOKEN_BYTES, TokenService, VerifiedToken,
    generate_refresh_token,
};
