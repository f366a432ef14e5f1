//! Telegram Bot API transport
//!
//! Long-polls `getUpdates` for commands and button presses and sends
//! notices with `sendMessage`. Plain JSON over `reqwest`, no bot
//! framework.

use super::{Buttons, ChatId, ChatTransport, Event, EventSource};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

pub const API_BASE: &str = "https://api.telegram.org";

/// Longest text `sendMessage` accepts, in characters.
const MAX_MESSAGE_LENGTH: usize = 4096;

/// Extra time the HTTP client waits beyond the long-poll timeout.
const HTTP_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    message: Option<Message>,
    data: Option<String>,
}

pub struct TelegramTransport {
    bot_token: String,
    api_base: String,
    client: reqwest::Client,
    poll_timeout: Duration,
    offset: AtomicI64,
}

impl TelegramTransport {
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn new(bot_token: impl Into<String>, poll_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(poll_timeout + HTTP_GRACE)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            bot_token: bot_token.into(),
            api_base: API_BASE.to_string(),
            client,
            poll_timeout,
            offset: AtomicI64::new(0),
        })
    }

    /// Point the transport at another Bot API server.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        // reqwest errors carry the URL, and the URL carries the token.
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("{method}: {}", e.without_url())))?;

        let status = resp.status();
        let parsed: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|e| Error::Delivery(format!("{method}: {}", e.without_url())))?;

        if !parsed.ok {
            return Err(Error::Delivery(format!(
                "{method} failed ({status}): {}",
                parsed.description.unwrap_or_default()
            )));
        }
        parsed
            .result
            .ok_or_else(|| Error::Delivery(format!("{method}: empty result")))
    }

    async fn answer_callback(&self, callback_id: &str) {
        let body = json!({ "callback_query_id": callback_id });
        if let Err(e) = self.call::<bool>("answerCallbackQuery", &body).await {
            warn!("Failed to acknowledge button press: {}", e);
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_notice(
        &self,
        chat_id: ChatId,
        text: &str,
        buttons: Option<&Buttons>,
    ) -> Result<()> {
        let chunks = split_message(text, MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = json!({ "chat_id": chat_id, "text": chunk });
            if let Some(buttons) = buttons.filter(|_| i == last) {
                body["reply_markup"] = reply_markup(buttons);
            }
            let _: Value = self.call("sendMessage", &body).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventSource for TelegramTransport {
    async fn next_events(&self) -> Result<Vec<Event>> {
        let body = json!({
            "offset": self.offset.load(Ordering::SeqCst),
            "timeout": self.poll_timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        let updates: Vec<Update> = self.call("getUpdates", &body).await?;

        let mut events = Vec::with_capacity(updates.len());
        for update in updates {
            self.offset.fetch_max(update.update_id + 1, Ordering::SeqCst);
            if let Some(callback) = &update.callback_query {
                self.answer_callback(&callback.id).await;
            }
            match parse_update(update) {
                Some(event) => events.push(event),
                None => debug!("Ignoring update without a command or action"),
            }
        }
        Ok(events)
    }
}

fn parse_update(update: Update) -> Option<Event> {
    if let Some(callback) = update.callback_query {
        let chat_id = callback
            .message
            .as_ref()
            .map_or(callback.from.id, |m| m.chat.id);
        return callback.data.map(|token| Event::Action { chat_id, token });
    }

    let message = update.message?;
    let name = normalize_command(message.text.as_deref()?)?;
    Some(Event::Command {
        chat_id: message.chat.id,
        name,
        first_name: message.from.and_then(|u| u.first_name),
    })
}

/// `"/Check@my_bot now"` becomes `"check"`. Text that is not a command
/// gives `None`.
fn normalize_command(text: &str) -> Option<String> {
    let word = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = word.split('@').next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_lowercase())
}

fn reply_markup(buttons: &Buttons) -> Value {
    match buttons {
        Buttons::Inline(row) => {
            let row: Vec<Value> = row
                .iter()
                .map(|b| json!({ "text": b.label, "callback_data": b.token }))
                .collect();
            json!({ "inline_keyboard": [row] })
        }
        Buttons::Reply(keys) => {
            let row: Vec<Value> = keys.iter().map(|k| json!({ "text": k })).collect();
            json!({ "keyboard": [row], "resize_keyboard": true })
        }
    }
}

/// Split `text` into chunks of at most `max_chars` characters,
/// preferring line breaks, then spaces.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    loop {
        let Some((limit, _)) = remaining.char_indices().nth(max_chars) else {
            chunks.push(remaining.to_string());
            break;
        };

        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
        if remaining.is_empty() {
            break;
        }
    }

    chunks
}
