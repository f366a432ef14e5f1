//! Error types for inbox-relay
//!
//! Decoding never produces an error: malformed headers and bodies
//! degrade to placeholder values in [`crate::DecodedMessage`].

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("IMAP error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Delivery error: {0}")]
    Delivery(String),
}

impl Error {
    /// Whether the failure happened while reaching or authenticating
    /// with the mail server, as opposed to a rejected command.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Tls(_) | Self::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
