//! Poll timer and scroll-proximity trigger for the message page store.
//!
//! Both triggers run on one task and go through the store's busy guard, so
//! a poll never races a backward page. Fetch errors are recorded on the
//! store and published as events; the next trigger retries.

use std::{sync::Arc, time::Duration};

use metrics::counter;
use shared::models::SubjectId;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::{
    events::{StoreKind, SyncEvent},
    page_store::{FetchOutcome, MessagePageStore},
    viewport::{ScrollAnchor, ViewportMetrics},
};

/// Timing and geometry knobs for [`FetchScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Period of the newest-page poll.
    pub poll_interval: Duration,
    /// Pixel distance from an edge that still counts as "at" the edge.
    pub edge_threshold: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            edge_threshold: 20,
        }
    }
}

/// Result of evaluating one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The viewport was not close enough to the relevant edge.
    NotNearEdge,
    /// The store was asked to fetch.
    Fetched(FetchOutcome),
    /// The fetch failed; the error is on the store's snapshot.
    Failed,
}

/// Drives [`MessagePageStore`] from a timer and viewport updates.
#[derive(Debug)]
pub struct FetchScheduler {
    store: Arc<MessagePageStore>,
    viewport: watch::Receiver<ViewportMetrics>,
    events: broadcast::Sender<SyncEvent>,
    config: SchedulerConfig,
}

impl FetchScheduler {
    /// Wires a scheduler to its store, viewport feed and event channel.
    pub fn new(
        store: Arc<MessagePageStore>,
        viewport: watch::Receiver<ViewportMetrics>,
        events: broadcast::Sender<SyncEvent>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            viewport,
            events,
            config,
        }
    }

    fn subject(&self) -> SubjectId {
        self.store.subject()
    }

    fn publish(&self, event: SyncEvent) {
        // No receivers is fine; hosts subscribe when they need to.
        let _ = self.events.send(event);
    }

    fn failed(&self, err: &crate::error::SyncError) -> TriggerOutcome {
        self.publish(SyncEvent::FetchFailed {
            store: StoreKind::Messages,
            message: err.to_string(),
        });
        TriggerOutcome::Failed
    }

    /// One poll tick: refresh the newest page only when the viewer is at the
    /// bottom.
    #[instrument(name = "scheduler.poll_tick", skip(self), fields(subject = %self.subject()))]
    pub async fn poll_tick(&self) -> TriggerOutcome {
        let metrics = *self.viewport.borrow();
        if !metrics.near_bottom(self.config.edge_threshold) {
            counter!("chatsync_poll_ticks_skipped_total").increment(1);
            debug!(
                distance = metrics.distance_to_bottom(),
                "viewer is reading older content; skipping poll"
            );
            return TriggerOutcome::NotNearEdge;
        }

        match self.store.refresh_newest().await {
            Ok(outcome) => {
                if let FetchOutcome::Applied(delta) = &outcome
                    && !delta.inserted.is_empty()
                {
                    self.publish(SyncEvent::NewestRefreshed {
                        inserted: delta.inserted.clone(),
                    });
                }
                TriggerOutcome::Fetched(outcome)
            }
            Err(err) => self.failed(&err),
        }
    }

    /// Scroll check for one viewport update: load an older page when the
    /// viewer reached the top.
    #[instrument(name = "scheduler.scroll_check", skip(self), fields(subject = %self.subject()))]
    pub async fn scroll_check(&self, metrics: ViewportMetrics) -> TriggerOutcome {
        if !metrics.near_top(self.config.edge_threshold) {
            return TriggerOutcome::NotNearEdge;
        }

        let anchor = ScrollAnchor::capture(&metrics);
        match self.store.load_older().await {
            Ok(outcome) => {
                if let FetchOutcome::Applied(delta) = &outcome {
                    self.publish(SyncEvent::OlderPrepended {
                        inserted: delta.inserted.clone(),
                        anchor,
                        exhausted: !self.store.has_more().await,
                    });
                }
                TriggerOutcome::Fetched(outcome)
            }
            Err(err) => self.failed(&err),
        }
    }

    /// Runs both triggers until `cancel` fires. The first poll happens one
    /// full interval after spawning.
    pub fn spawn(self, cancel: CancellationToken) -> SchedulerHandle {
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let period = self.config.poll_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut viewport = self.viewport.clone();
            let mut viewport_open = true;

            info!(subject = %self.subject(), ?period, "fetch scheduler started");
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.poll_tick().await;
                    }
                    changed = viewport.changed(), if viewport_open => {
                        if changed.is_err() {
                            debug!("viewport feed closed; scroll trigger detached");
                            viewport_open = false;
                            continue;
                        }
                        let metrics = *viewport.borrow_and_update();
                        self.scroll_check(metrics).await;
                    }
                }
            }
            debug!(subject = %self.subject(), "fetch scheduler stopped");
        });
        SchedulerHandle { cancel: token, task }
    }
}

/// Owns a running scheduler task. Dropping the handle stops it.
#[derive(Debug)]
pub struct SchedulerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops the timer and detaches the viewport listener. A fetch already in
    /// flight finishes, but the store discards its result once disposed.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    /// Whether the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
