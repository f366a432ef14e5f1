//! Chat transport
//!
//! The relay talks to its owner through a [`ChatTransport`] (outbound
//! notices) and an [`EventSource`] (inbound commands and button
//! presses). [`telegram::TelegramTransport`] implements both over the
//! Telegram Bot API.

pub mod telegram;

use crate::error::Result;
use async_trait::async_trait;

pub use telegram::TelegramTransport;

/// A chat identity as the transport reports it.
pub type ChatId = i64;

/// A button attached to a single notice. Pressing it comes back as an
/// [`Event::Action`] carrying `token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub token: String,
}

/// Buttons that may accompany a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Buttons {
    /// Buttons under the notice itself.
    Inline(Vec<InlineButton>),
    /// A persistent keyboard whose keys send their label as a message.
    Reply(Vec<String>),
}

/// Something the chat side asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A `/command`, normalized to lowercase without the slash or a
    /// `@botname` suffix.
    Command {
        chat_id: ChatId,
        name: String,
        first_name: Option<String>,
    },
    /// A button press with its opaque token.
    Action { chat_id: ChatId, token: String },
}

impl Event {
    #[must_use]
    pub const fn chat_id(&self) -> ChatId {
        match self {
            Self::Command { chat_id, .. } | Self::Action { chat_id, .. } => *chat_id,
        }
    }
}

/// Outbound side of the chat.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver one notice.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Delivery`] if the chat service refused or
    /// could not be reached.
    async fn send_notice(&self, chat_id: ChatId, text: &str, buttons: Option<&Buttons>)
    -> Result<()>;
}

/// Inbound side of the chat.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Wait for the next batch of events. May return an empty batch
    /// when the long poll times out.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Delivery`] if the chat service could not
    /// be polled.
    async fn next_events(&self) -> Result<Vec<Event>>;
}
