//! Notification dispatcher
//!
//! Formats decoded messages into chat notices and hands them to the
//! transport. Delivery failures are logged and swallowed: one lost
//! notice must not abort a pass that covers several messages.

use crate::decoder::DecodedMessage;
use crate::transport::{Buttons, ChatId, ChatTransport, InlineButton};
use std::sync::Arc;
use tracing::{debug, warn};

/// Label of the button that asks for the full message.
pub const READ_BUTTON_LABEL: &str = "📖 Read";

/// Header-only notice text.
#[must_use]
pub fn summary_text(msg: &DecodedMessage) -> String {
    format!("📧 Subject: {}\n👤 From: {}", msg.subject, msg.sender())
}

/// Header and body notice text.
#[must_use]
pub fn full_text(msg: &DecodedMessage) -> String {
    let body = match msg.body.as_deref() {
        Some(body) if !body.is_empty() => body,
        _ => "(empty)",
    };
    format!(
        "{}\n📅 Sent: {}\n📝 Body:\n{}",
        summary_text(msg),
        msg.sent,
        body
    )
}

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn ChatTransport>,
    owner: ChatId,
}

impl Dispatcher {
    #[must_use]
    pub fn new(transport: Arc<dyn ChatTransport>, owner: ChatId) -> Self {
        Self { transport, owner }
    }

    #[must_use]
    pub const fn owner(&self) -> ChatId {
        self.owner
    }

    /// Announce a message by its headers, with a button to read the
    /// rest. Returns the button's action token.
    pub async fn notify_summary(&self, msg: &DecodedMessage) -> String {
        let token = msg.uid.read_action();
        let buttons = Buttons::Inline(vec![InlineButton {
            label: READ_BUTTON_LABEL.to_string(),
            token: token.clone(),
        }]);
        self.deliver(self.owner, &summary_text(msg), Some(&buttons))
            .await;
        token
    }

    /// Send the whole message.
    pub async fn notify_full(&self, msg: &DecodedMessage) {
        self.deliver(self.owner, &full_text(msg), None).await;
    }

    /// Send a plain status or error notice to the owner.
    pub async fn notify(&self, text: &str) {
        self.deliver(self.owner, text, None).await;
    }

    /// Send a notice with buttons to an arbitrary chat.
    pub async fn send_to(&self, chat_id: ChatId, text: &str, buttons: Option<&Buttons>) {
        self.deliver(chat_id, text, buttons).await;
    }

    async fn deliver(&self, chat_id: ChatId, text: &str, buttons: Option<&Buttons>) {
        match self.transport.send_notice(chat_id, text, buttons).await {
            Ok(()) => debug!("Notice delivered to {}", chat_id),
            Err(e) => warn!("Failed to deliver notice to {}: {}", chat_id, e),
        }
    }
}
