//! The set of messages already announced to the owner
//!
//! Background polls, on-demand checks and "read" presses all touch this
//! set concurrently. Every operation takes the one lock and completes
//! without awaiting, so "compute the delta and record it" and "forget
//! a consumed message" are each atomic with respect to one another.
//!
//! The set is memory-only: a restart starts empty and may announce
//! still-unseen messages a second time.

use crate::uid::Uid;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct AnnouncedSet {
    inner: Mutex<HashSet<Uid>>,
}

impl AnnouncedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Uid>> {
        // The set is valid after any panic: every mutation is a single
        // insert or remove.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record every UID in `unseen` that is not announced yet and
    /// return those, in the order given.
    ///
    /// Duplicates inside `unseen` are returned once. The whole batch is
    /// recorded before this returns, so a concurrent caller can never
    /// receive any of them as well.
    #[must_use]
    pub fn admit(&self, unseen: &[Uid]) -> Vec<Uid> {
        let mut set = self.lock();
        unseen
            .iter()
            .copied()
            .filter(|uid| set.insert(*uid))
            .collect()
    }

    /// Forget `uid` so a later reconciliation may announce it again.
    ///
    /// Returns whether it was present; forgetting an unknown UID is a
    /// no-op.
    pub fn forget(&self, uid: Uid) -> bool {
        self.lock().remove(&uid)
    }

    /// Forget several UIDs at once.
    pub fn forget_all(&self, uids: &[Uid]) {
        let mut set = self.lock();
        for uid in uids {
            set.remove(uid);
        }
    }

    #[must_use]
    pub fn contains(&self, uid: Uid) -> bool {
        self.lock().contains(&uid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The announced UIDs in ascending order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Uid> {
        let mut uids: Vec<Uid> = self.lock().iter().copied().collect();
        uids.sort_unstable();
        uids
    }
}
