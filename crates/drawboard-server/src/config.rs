//! Server configuration from environment variables.

use drawboard::ServerConfig;
use drawboard_auth::AuthConfig;
use drawboard_hub::HubConfig;

/// A required variable is missing or a value doesn't parse.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Reads the configuration from the process environment.
pub fn from_env() -> Result<ServerConfig, ConfigError> {
    from_lookup(|name| std::env::var(name).ok())
}

/// Builds the configuration from any variable source.
///
/// | Variable                 | Default          |
/// |--------------------------|------------------|
/// | `HTTP_ADDR`              | `127.0.0.1:8080` |
/// | `WS_ADDR`                | `127.0.0.1:8081` |
/// | `SECRETKEY_FOR_JWT`      | required         |
/// | `ACCESS_TOKEN_TTL_SECS`  | `900`            |
/// | `REFRESH_TOKEN_TTL_SECS` | `604800`         |
/// | `HUB_OUTBOUND_CAPACITY`  | `64`             |
/// | `HUB_ECHO_TO_SENDER`     | `true`           |
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<ServerConfig, ConfigError> {
    let defaults = ServerConfig::default();

    let secret = lookup("SECRETKEY_FOR_JWT")
        .filter(|secret| !secret.trim().is_empty())
        .ok_or(ConfigError::Missing("SECRETKEY_FOR_JWT"))?;

    let auth = AuthConfig {
        access_ttl: seconds(&lookup, "ACCESS_TOKEN_TTL_SECS", defaults.auth.access_ttl)?,
        refresh_ttl: seconds(&lookup, "REFRESH_TOKEN_TTL_SECS", defaults.auth.refresh_ttl)?,
        ..AuthConfig::with_secret(secret)
    };
    let hub = HubConfig {
        outbound_capacity: parsed(&lookup, "HUB_OUTBOUND_CAPACITY", defaults.hub.outbound_capacity)?,
        echo_to_sender: parsed(&lookup, "HUB_ECHO_TO_SENDER", defaults.hub.echo_to_sender)?,
        ..defaults.hub
    };

    Ok(ServerConfig {
        http_addr: lookup("HTTP_ADDR").unwrap_or(defaults.http_addr),
        realtime_addr: lookup("WS_ADDR").unwrap_or(defaults.realtime_addr),
        auth,
        hub,
    })
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = lookup(name) else {
        return Ok(default);
    };
    let result = value.trim().parse::<T>();
    match result {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Longest accepted token lifetime: ten years.
const MAX_TTL_SECS: i64 = 3650 * 86_400;

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: chrono::Duration,
) -> Result<chrono::Duration, ConfigError> {
    let secs: i64 = parsed(lookup, name, default.num_seconds())?;
    if secs <= 0 {
        return Err(ConfigError::Invalid {
            name,
            value: secs.to_string(),
            reason: "must be positive".into(),
        });
    }
    chrono::Duration::try_seconds(secs)
        .filter(|_| secs <= MAX_TTL_SECS)
        .ok_or_else(|| ConfigError::Invalid {
            name,
            value: secs.to_string(),
            reason: format!("must be at most {MAX_TTL_SECS} seconds"),
        })
}
