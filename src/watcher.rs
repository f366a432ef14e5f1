//! Background poll loop

use crate::reconciler::{ReconcileReport, Reconciler, Trigger};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Sleeps for the poll interval, then runs a background reconciliation,
/// forever. A failed pass is reported to the owner and the loop carries
/// on at the next interval.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    interval: Duration,
}

impl Watcher {
    #[must_use]
    pub const fn new(reconciler: Arc<Reconciler>, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
        }
    }

    /// One background pass. Returns the report, or `None` if the pass
    /// failed and the owner was told.
    pub async fn tick(&self) -> Option<ReconcileReport> {
        match self.reconciler.reconcile(Trigger::Background).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Background check failed: {}", e);
                self.reconciler
                    .dispatcher()
                    .notify(&format!("Error in background check: {e}"))
                    .await;
                None
            }
        }
    }

    pub async fn run(self) {
        info!("Polling every {}s", self.interval.as_secs());
        loop {
            tokio::time::sleep(self.interval).await;
            let _ = self.tick().await;
        }
    }
}
