//! Unseen-set reconciliation
//!
//! Compares the server's unseen UIDs with the [`AnnouncedSet`] and
//! announces the difference. New arrivals are recorded before any
//! notice goes out, so a pass that dies halfway may under-notify but
//! never announces the same message twice.

use crate::announced::AnnouncedSet;
use crate::decoder::{self, DecodedMessage};
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::store::{MailSession, MailStore};
use crate::uid::Uid;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What started a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The periodic poll. Silent unless something new arrived.
    Background,
    /// An explicit request from the owner. Always answered with a
    /// status notice.
    OnDemand,
}

/// Outcome of one successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Every unseen UID the server reported, in its order.
    pub unseen: Vec<Uid>,
    /// The subset announced by this pass, in the same order.
    pub arrivals: Vec<Uid>,
}

pub struct Reconciler {
    store: Arc<dyn MailStore>,
    announced: AnnouncedSet,
    dispatcher: Dispatcher,
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Arc<dyn MailStore>, dispatcher: Dispatcher) -> Self {
        Self {
            store,
            announced: AnnouncedSet::new(),
            dispatcher,
        }
    }

    #[must_use]
    pub const fn announced(&self) -> &AnnouncedSet {
        &self.announced
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one full pass: list unseen messages, record the new ones and
    /// send a summary notice for each.
    ///
    /// # Errors
    ///
    /// Fails if the session cannot be opened or the server rejects a
    /// command. Summaries fetched before a failed FETCH are still sent,
    /// the failing UID stays recorded and the arrivals after it are
    /// released for the next pass. The session is closed either way.
    pub async fn reconcile(&self, trigger: Trigger) -> Result<ReconcileReport> {
        let mut session = self.store.open_session().await?;
        let result = self.reconcile_in(session.as_mut(), trigger).await;
        session.logout().await;
        result
    }

    async fn reconcile_in(
        &self,
        session: &mut dyn MailSession,
        trigger: Trigger,
    ) -> Result<ReconcileReport> {
        let unseen = decoder::list_unseen_identifiers(session).await?;
        let arrivals = self.announced.admit(&unseen);

        if arrivals.is_empty() {
            debug!("{} unseen, nothing new", unseen.len());
            if let Some(status) = status_text(trigger, unseen.len(), 0) {
                self.dispatcher.notify(&status).await;
            }
            return Ok(ReconcileReport { unseen, arrivals });
        }

        info!(
            "{} unseen, {} new: {:?}",
            unseen.len(),
            arrivals.len(),
            arrivals
        );

        let mut fetched = Vec::with_capacity(arrivals.len());
        let mut failure = None;
        for (i, uid) in arrivals.iter().enumerate() {
            match decoder::fetch_headers(session, *uid).await {
                Ok(msg) => fetched.push(msg),
                Err(e) => {
                    // The failing UID stays recorded; the ones queued
                    // behind it were never tried and get another chance.
                    let untried = &arrivals[i + 1..];
                    self.announced.forget_all(untried);
                    warn!("Fetching UID {} failed, releasing {:?}", uid, untried);
                    failure = Some(e);
                    break;
                }
            }
        }

        let status = if failure.is_none() {
            status_text(trigger, unseen.len(), fetched.len())
        } else {
            batch_header(fetched.len())
        };
        if let Some(status) = status {
            self.dispatcher.notify(&status).await;
        }
        for msg in &fetched {
            self.dispatcher.notify_summary(msg).await;
        }

        if let Some(e) = failure {
            return Err(e);
        }
        Ok(ReconcileReport { unseen, arrivals })
    }

    /// Forget `uid` and fetch the whole message.
    ///
    /// Forgetting is unconditional and happens first: a UID that was
    /// never announced is simply fetched. If the message is still unseen
    /// on the server later, the next pass announces it again.
    ///
    /// # Errors
    ///
    /// Fails if the session cannot be opened or the FETCH fails.
    pub async fn consume(&self, uid: Uid) -> Result<DecodedMessage> {
        let was_announced = self.announced.forget(uid);
        debug!("Consuming UID {} (announced: {})", uid, was_announced);

        let mut session = self.store.open_session().await?;
        let result = decoder::fetch_full(session.as_mut(), uid).await;
        session.logout().await;
        result
    }
}

/// The header sent ahead of a batch of summaries, counting only the
/// summaries that follow it.
fn batch_header(count: usize) -> Option<String> {
    (count > 0).then(|| format!("📩 You have {count} new message(s)"))
}

fn status_text(trigger: Trigger, unseen: usize, arrivals: usize) -> Option<String> {
    match trigger {
        Trigger::Background => batch_header(arrivals),
        Trigger::OnDemand if unseen == 0 => Some("You have no unread messages.".to_string()),
        Trigger::OnDemand if arrivals == 0 => Some(format!(
            "You have {unseen} unread message(s), nothing new since the last check."
        )),
        Trigger::OnDemand => Some(format!(
            "You have {unseen} unread message(s), {arrivals} new."
        )),
    }
}
