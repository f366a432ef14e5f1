//! Inbox relay library
//!
//! Watches an IMAP inbox and relays unread-mail summaries to a chat.
//! The owner can ask for an immediate check and press a button under
//! any summary to receive the whole message.
//!
//! The pieces, leaf first:
//!
//! - [`ImapStore`] opens one short-lived IMAP session per operation.
//! - [`decode`] turns raw RFC 2822 bytes into a [`DecodedMessage`].
//! - [`Reconciler`] tracks what was already announced in an
//!   [`AnnouncedSet`] and announces only the difference.
//! - [`Dispatcher`] formats notices for a [`ChatTransport`].
//! - [`Router`] and [`Watcher`] drive the reconciler from chat events
//!   and from a timer.

mod announced;
mod config;
mod connection;
mod decoder;
mod dispatcher;
mod error;
mod html;
mod reconciler;
mod router;
mod store;
pub mod transport;
mod uid;
mod watcher;


pub use announced::AnnouncedSet;
pub use config::{INBOX, ImapConfig, RelayConfig, TlsMode};
pub use decoder::{
    DecodedMessage, NO_SUBJECT, SentDate, UNKNOWN_DATE, UNKNOWN_SENDER, decode, fetch_full,
    fetch_headers, list_unseen_identifiers,
};
pub use dispatcher::{Dispatcher, READ_BUTTON_LABEL, full_text, summary_text};
pub use error::{Error, Result};
pub use html::html_to_text;
pub use reconciler::{ReconcileReport, Reconciler, Trigger};
pub use router::Router;
pub use store::{FetchPart, ImapStore, MailSession, MailStore};
pub use transport::{Buttons, ChatId, ChatTransport, Event, EventSource, InlineButton};
pub use uid::{READ_ACTION_PREFIX, Uid};
pub use watcher::Watcher;
