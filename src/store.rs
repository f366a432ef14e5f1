//! Mail store abstraction
//!
//! A [`MailStore`] hands out [`MailSession`]s: one fresh, authenticated
//! connection with the watched folder selected, owned by exactly one
//! logical operation (a poll tick or a single fetch). Sessions are
//! never pooled or shared because an IMAP connection cannot multiplex
//! concurrent commands.
//!
//! The operation that opens a session must call
//! [`MailSession::logout`] on every exit path, including failures.

use crate::config::ImapConfig;
use crate::connection::{self, ImapSession, bounded};
use crate::error::{Error, Result};
use crate::uid::Uid;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tracing::debug;

/// Which part of a message a FETCH should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPart {
    /// Header block only, without touching the `\Seen` flag.
    Header,
    /// The whole RFC 2822 message. Servers set `\Seen` as a side
    /// effect.
    Full,
}

impl FetchPart {
    #[must_use]
    pub const fn query(self) -> &'static str {
        match self {
            Self::Header => "(BODY.PEEK[HEADER])",
            Self::Full => "(BODY[])",
        }
    }
}

/// One live, authenticated connection with the folder selected.
#[async_trait]
pub trait MailSession: Send {
    /// `UID SEARCH <query>`.
    async fn uid_search(&mut self, query: &str) -> Result<Vec<Uid>>;

    /// `UID FETCH` a single message. `Ok(None)` means the server
    /// answered OK but returned no data for that UID.
    async fn uid_fetch(&mut self, uid: Uid, part: FetchPart) -> Result<Option<Vec<u8>>>;

    /// Close the connection. Never fails.
    async fn logout(&mut self);
}

/// Opens mail sessions.
#[async_trait]
pub trait MailStore: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn MailSession>>;
}

/// [`MailStore`] backed by a real IMAP server.
#[derive(Debug, Clone)]
pub struct ImapStore {
    config: ImapConfig,
}

impl ImapStore {
    #[must_use]
    pub const fn new(config: ImapConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailStore for ImapStore {
    async fn open_session(&self) -> Result<Box<dyn MailSession>> {
        let session = connection::open(&self.config).await?;
        Ok(Box::new(ImapMailSession {
            inner: session,
            timeout: self.config.timeout,
        }))
    }
}

struct ImapMailSession {
    inner: ImapSession,
    timeout: Duration,
}

#[async_trait]
impl MailSession for ImapMailSession {
    async fn uid_search(&mut self, query: &str) -> Result<Vec<Uid>> {
        let session = &mut self.inner;
        let uids = bounded(self.timeout, "UID SEARCH", async {
            session
                .uid_search(query)
                .await
                .map_err(|e| Error::Protocol(format!("Search failed: {e}")))
        })
        .await?;

        // async-imap collects the SEARCH response into a set, so the
        // wire order is gone. Servers list hits in ascending UID order,
        // which is what this restores.
        let mut uids: Vec<Uid> = uids.into_iter().map(Uid).collect();
        uids.sort_unstable();
        debug!("UID SEARCH {} -> {} hit(s)", query, uids.len());
        Ok(uids)
    }

    async fn uid_fetch(&mut self, uid: Uid, part: FetchPart) -> Result<Option<Vec<u8>>> {
        let session = &mut self.inner;
        bounded(self.timeout, "UID FETCH", async {
            let mut messages = session
                .uid_fetch(uid.to_string(), part.query())
                .await
                .map_err(|e| Error::Protocol(format!("Fetch failed: {e}")))?;

            // Drain the whole response so the connection stays in sync
            // for the next command.
            let mut data = None;
            while let Some(msg_result) = messages.next().await {
                let msg = msg_result.map_err(|e| Error::Protocol(format!("Fetch error: {e}")))?;
                if msg.uid != Some(uid.get()) {
                    debug!("Ignoring FETCH data for UID {:?}", msg.uid);
                    continue;
                }
                let bytes = match part {
                    FetchPart::Header => msg.header(),
                    FetchPart::Full => msg.body(),
                };
                if data.is_none() {
                    data = bytes.map(<[u8]>::to_vec);
                }
            }
            Ok(data)
        })
        .await
    }

    async fn logout(&mut self) {
        connection::logout(&mut self.inner, self.timeout).await;
    }
}
