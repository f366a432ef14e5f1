//! Message decoding
//!
//! Turns raw RFC 2822 bytes into a [`DecodedMessage`]. Decoding never
//! fails: a header that cannot be decoded falls back to its raw bytes
//! read as lossy UTF-8, a missing or unparseable `Date` becomes
//! [`SentDate::Unknown`], and a message without a renderable part gets
//! an empty body. One malformed message must not stop the others from
//! being announced.

use crate::error::{Error, Result};
use crate::html::html_to_text;
use crate::store::{FetchPart, MailSession};
use crate::uid::Uid;
use chrono::{NaiveDate, NaiveDateTime};
use mail_parser::{Message, MessageParser, MimeHeaders, PartType};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Shown when the `Date` header is absent or unparseable.
pub const UNKNOWN_DATE: &str = "unknown date";
/// Shown when the message has no usable subject.
pub const NO_SUBJECT: &str = "(no subject)";
/// Shown when the message has no usable sender.
pub const UNKNOWN_SENDER: &str = "unknown sender";

/// When the message was sent, as declared by the sender.
///
/// The time is the wall-clock time in the offset the `Date` header
/// declares; it is not converted to the reader's zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SentDate {
    Known(NaiveDateTime),
    Unknown,
}

impl fmt::Display for SentDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(dt) => write!(f, "{}", dt.format("%d.%m.%Y %H:%M")),
            Self::Unknown => f.write_str(UNKNOWN_DATE),
        }
    }
}

/// Read-only view of one message, rebuilt on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedMessage {
    pub uid: Uid,
    pub sender_name: Option<String>,
    pub sender_address: Option<String>,
    pub subject: String,
    pub sent: SentDate,
    /// `None` when only the header block was fetched.
    pub body: Option<String>,
}

impl DecodedMessage {
    /// `"Name <address>"`, or just the address when there is no
    /// display name.
    #[must_use]
    pub fn sender(&self) -> String {
        match (self.sender_name.as_deref(), self.sender_address.as_deref()) {
            (Some(name), Some(address)) => format!("{name} <{address}>"),
            (None, Some(address)) => address.to_string(),
            (Some(name), None) => name.to_string(),
            (None, None) => UNKNOWN_SENDER.to_string(),
        }
    }
}

/// List the UIDs of unseen messages in the selected folder, in the
/// order the session reports them.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the server rejects the search.
pub async fn list_unseen_identifiers(session: &mut dyn MailSession) -> Result<Vec<Uid>> {
    session.uid_search("UNSEEN").await
}

/// Fetch and decode the header block of `uid`. The body is left out
/// and the message stays unseen on the server.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the FETCH fails or returns no data.
pub async fn fetch_headers(session: &mut dyn MailSession, uid: Uid) -> Result<DecodedMessage> {
    fetch(session, uid, FetchPart::Header).await
}

/// Fetch and decode the whole message `uid`, body included.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the FETCH fails or returns no data.
pub async fn fetch_full(session: &mut dyn MailSession, uid: Uid) -> Result<DecodedMessage> {
    fetch(session, uid, FetchPart::Full).await
}

async fn fetch(session: &mut dyn MailSession, uid: Uid, part: FetchPart) -> Result<DecodedMessage> {
    let raw = session
        .uid_fetch(uid, part)
        .await?
        .ok_or_else(|| Error::Protocol(format!("No data found for UID {uid}")))?;
    Ok(decode(uid, &raw, part))
}

/// Decode raw message bytes.
///
/// With [`FetchPart::Header`] the body is not looked at and
/// [`DecodedMessage::body`] is `None`.
#[must_use]
pub fn decode(uid: Uid, raw: &[u8], part: FetchPart) -> DecodedMessage {
    let Some(parsed) = MessageParser::default().parse(raw) else {
        debug!("UID {} is not a parseable message, using raw headers", uid);
        return DecodedMessage {
            uid,
            sender_name: None,
            sender_address: raw_header(raw, "From"),
            subject: raw_header(raw, "Subject").unwrap_or_else(|| NO_SUBJECT.to_string()),
            sent: SentDate::Unknown,
            body: (part == FetchPart::Full).then(String::new),
        };
    };

    let (sender_name, sender_address) = sender(&parsed, raw);

    DecodedMessage {
        uid,
        sender_name,
        sender_address,
        subject: subject(&parsed, raw),
        sent: sent_date(&parsed),
        body: (part == FetchPart::Full).then(|| body_text(&parsed)),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn subject(parsed: &Message<'_>, raw: &[u8]) -> String {
    parsed
        .subject()
        .and_then(non_empty)
        .or_else(|| raw_header(raw, "Subject"))
        .unwrap_or_else(|| NO_SUBJECT.to_string())
}

fn sender(parsed: &Message<'_>, raw: &[u8]) -> (Option<String>, Option<String>) {
    let first = parsed.from().and_then(|addr| addr.first());
    let name = first.and_then(|a| a.name()).and_then(non_empty);
    let address = first.and_then(|a| a.address()).and_then(non_empty);

    if name.is_none() && address.is_none() {
        return (None, raw_header(raw, "From"));
    }
    (name, address)
}

fn sent_date(parsed: &Message<'_>) -> SentDate {
    parsed
        .date()
        .and_then(|d| {
            NaiveDate::from_ymd_opt(i32::from(d.year), u32::from(d.month), u32::from(d.day))?
                .and_hms_opt(u32::from(d.hour), u32::from(d.minute), u32::from(d.second))
        })
        .map_or(SentDate::Unknown, SentDate::Known)
}

/// Walk every part and render the last `text/plain` or `text/html`
/// one. Empty when there is none.
fn body_text(parsed: &Message<'_>) -> String {
    let mut text = String::new();
    for part in &parsed.parts {
        match &part.body {
            PartType::Html(html) => text = html_to_text(html),
            PartType::Text(plain) if is_plain(part.content_type()) => text = plain_text(plain),
            _ => {}
        }
    }
    text
}

fn is_plain(content_type: Option<&mail_parser::ContentType<'_>>) -> bool {
    content_type.is_none_or(|ct| {
        ct.ctype().eq_ignore_ascii_case("text")
            && ct.subtype().is_none_or(|s| s.eq_ignore_ascii_case("plain"))
    })
}

fn plain_text(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Find a header in the raw header block and return its unfolded value
/// as lossy UTF-8.
fn raw_header(raw: &[u8], name: &str) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let mut value: Option<String> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            break;
        }
        if let Some(current) = value.as_mut() {
            if line.starts_with([' ', '\t']) {
                current.push(' ');
                current.push_str(line.trim());
                continue;
            }
            break;
        }
        if let Some((key, rest)) = line.split_once(':')
            && key.trim().eq_ignore_ascii_case(name)
        {
            value = Some(rest.trim().to_string());
        }
    }

    value.and_then(|v| non_empty(&v))
}
