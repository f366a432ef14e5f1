//! Relay configuration
//!
//! Everything is read once at startup. [`RelayConfig::from_env`] loads
//! a `.env` file (if present) and then reads the process environment;
//! [`RelayConfig::from_vars`] takes any lookup function so tests do not
//! have to touch the real environment.

use crate::error::{Error, Result};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The watched folder. Only the primary inbox is supported.
pub const INBOX: &str = "INBOX";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_UPDATES_TIMEOUT_SECS: u64 = 30;

/// How the IMAP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS from the first byte (IMAPS, usually port 993).
    Implicit,
    /// Plain TCP upgraded with `STARTTLS` (usually port 143).
    StartTls,
}

impl TlsMode {
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Implicit => 993,
            Self::StartTls => 143,
        }
    }
}

impl FromStr for TlsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "implicit" | "tls" | "ssl" => Ok(Self::Implicit),
            "starttls" => Ok(Self::StartTls),
            other => Err(Error::Config(format!(
                "Invalid IMAP_TLS '{other}' (expected implicit or starttls)"
            ))),
        }
    }
}

/// IMAP connection configuration
#[derive(Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub tls: TlsMode,
    /// Skip certificate verification (local bridges with self-signed
    /// certificates).
    pub accept_invalid_certs: bool,
    /// Upper bound for every network step of a mail operation.
    pub timeout: Duration,
    pub folder: String,
}

impl fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tls", &self.tls)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout", &self.timeout)
            .field("folder", &self.folder)
            .finish()
    }
}

/// Process-wide configuration for the relay.
#[derive(Clone)]
pub struct RelayConfig {
    pub imap: ImapConfig,
    /// The only chat identity allowed to use the bot.
    pub owner_chat_id: i64,
    pub bot_token: String,
    pub poll_interval: Duration,
    /// Long-poll timeout for chat updates.
    pub updates_timeout: Duration,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("imap", &self.imap)
            .field("owner_chat_id", &self.owner_chat_id)
            .field("bot_token", &"<redacted>")
            .field("poll_interval", &self.poll_interval)
            .field("updates_timeout", &self.updates_timeout)
            .finish()
    }
}

impl RelayConfig {
    /// Load the configuration from environment variables.
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `BOT_TOKEN`
    /// - `OWNER_CHAT_ID`
    /// - `IMAP_HOST`
    /// - `IMAP_USERNAME`
    /// - `IMAP_PASSWORD`
    ///
    /// Optional (with defaults):
    /// - `IMAP_TLS` (default: `implicit`)
    /// - `IMAP_PORT` (default: 993, or 143 with `starttls`)
    /// - `IMAP_ACCEPT_INVALID_CERTS` (default: `false`)
    /// - `IMAP_TIMEOUT_SECS` (default: 30)
    /// - `POLL_INTERVAL_SECS` (default: 60)
    /// - `UPDATES_TIMEOUT_SECS` (default: 30)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`RelayConfig::from_env`].
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{key} not set")))
        };

        let tls = lookup("IMAP_TLS")
            .map_or(Ok(TlsMode::Implicit), |v| v.parse::<TlsMode>())?;

        let port = match lookup("IMAP_PORT") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid IMAP_PORT: {e}")))?,
            None => tls.default_port(),
        };

        let accept_invalid_certs = match lookup("IMAP_ACCEPT_INVALID_CERTS") {
            Some(v) => parse_bool("IMAP_ACCEPT_INVALID_CERTS", &v)?,
            None => false,
        };

        let imap = ImapConfig {
            host: required("IMAP_HOST")?,
            port,
            username: required("IMAP_USERNAME")?,
            password: required("IMAP_PASSWORD")?,
            tls,
            accept_invalid_certs,
            timeout: seconds(&lookup, "IMAP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            folder: INBOX.to_string(),
        };

        let owner_chat_id = required("OWNER_CHAT_ID")?
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid OWNER_CHAT_ID: {e}")))?;

        Ok(Self {
            imap,
            owner_chat_id,
            bot_token: required("BOT_TOKEN")?,
            poll_interval: seconds(&lookup, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            updates_timeout: seconds(
                &lookup,
                "UPDATES_TIMEOUT_SECS",
                DEFAULT_UPDATES_TIMEOUT_SECS,
            )?,
        })
    }
}

fn seconds<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(key) {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::Config(format!("Invalid {key}: {e}")))?,
        None => default,
    };
    if secs == 0 {
        return Err(Error::Config(format!("{key} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!("Invalid {key}: '{other}'"))),
    }
}
