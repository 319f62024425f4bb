use std::net::SocketAddr;
use std::time::Duration;

use crate::crypto::PBKDF2_ITERATIONS;

/// Application-level constants
pub const APP_NAME: &str = "Prosthetics Portal";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the session cookie set on login.
pub const SESSION_COOKIE: &str = "portal_session";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_SESSION_TTL_HOURS: u64 = 24;

/// Longest session a config may ask for (one year).
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(MAX_SESSION_TTL_HOURS * 3600);

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "prosthetics_portal=info,tower_http=warn"
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from `PORTAL_*` environment variables.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub session_ttl: Duration,
    pub password_iterations: u32,
    /// Load the demo patient and doctor on startup.
    pub seed_demo: bool,
    /// Add `Secure` to the session cookie (set behind TLS).
    pub secure_cookie: bool,
    /// Take the client address from `X-Forwarded-For` instead of the
    /// TCP peer. Only safe behind a proxy that overwrites the header.
    pub trust_proxy: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_HOURS * 3600),
            password_iterations: PBKDF2_ITERATIONS,
            seed_demo: true,
            secure_cookie: false,
            trust_proxy: false,
        }
    }
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr: SocketAddr = parse_or(&lookup, "PORTAL_BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;
        let ttl_hours: u64 = parse_or(&lookup, "PORTAL_SESSION_TTL_HOURS", Some(DEFAULT_SESSION_TTL_HOURS))?;
        let password_iterations: u32 =
            parse_or(&lookup, "PORTAL_PASSWORD_ITERATIONS", Some(PBKDF2_ITERATIONS))?;
        let seed_demo = parse_flag(&lookup, "PORTAL_SEED_DEMO", true)?;
        let secure_cookie = parse_flag(&lookup, "PORTAL_SECURE_COOKIE", false)?;
        let trust_proxy = parse_flag(&lookup, "PORTAL_TRUST_PROXY", false)?;

        if ttl_hours == 0 || ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(ConfigError::Invalid {
                key: "PORTAL_SESSION_TTL_HOURS",
                value: ttl_hours.to_string(),
            });
        }
        if password_iterations == 0 {
            return Err(ConfigError::Invalid {
                key: "PORTAL_PASSWORD_ITERATIONS",
                value: "0".into(),
            });
        }

        Ok(Self {
            bind_addr,
            session_ttl: Duration::from_secs(ttl_hours * 3600),
            password_iterations,
            seed_demo,
            secure_cookie,
            trust_proxy,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => default.ok_or(ConfigError::Invalid {
            key,
            value: String::new(),
        }),
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            key,
            value: other.to_string(),
        }),
    }
}
