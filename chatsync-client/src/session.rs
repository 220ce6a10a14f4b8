//! Per-subject session wiring and the subject-switching synchronizer.

use std::sync::Arc;

use shared::{
    config::ClientConfig,
    models::{LikeState, Message, MessageId, SubjectId, ViewerId},
};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::{
    access::{AccessGate, StreamAccess},
    api::StreamApi,
    error::{SyncError, SyncResult},
    events::{StoreKind, SyncEvent},
    mutation::MutationLayer,
    page_store::{FetchOutcome, MessagePageStore},
    replies::ReplyBucketStore,
    scheduler::{FetchScheduler, SchedulerConfig, SchedulerHandle},
    viewport::ViewportMetrics,
};

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Session parameters, fixed once a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Top-level messages per page.
    pub page_size: usize,
    /// Replies per bucket page.
    pub reply_page_size: usize,
    /// Poll period and edge threshold.
    pub scheduler: SchedulerConfig,
    /// Events buffered per subscriber before slow receivers start lagging.
    pub event_capacity: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            reply_page_size: 10,
            scheduler: SchedulerConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl From<&ClientConfig> for SyncSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            page_size: config.page_size,
            reply_page_size: config.reply_page_size,
            scheduler: SchedulerConfig {
                poll_interval: config.poll_interval(),
                edge_threshold: config.edge_threshold_px,
            },
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Everything synchronized for one subject: stores, mutations, scheduler
/// and the event feed.
#[derive(Debug)]
pub struct StreamSession {
    subject: SubjectId,
    access: StreamAccess,
    messages: Arc<MessagePageStore>,
    replies: Arc<ReplyBucketStore>,
    mutations: MutationLayer,
    events: broadcast::Sender<SyncEvent>,
    viewport: watch::Sender<ViewportMetrics>,
    scheduler: SchedulerHandle,
}

impl StreamSession {
    /// Checks access, loads the newest page and starts the scheduler.
    ///
    /// A failed initial load does not abort the session: the error is left
    /// on the page store and the first poll retries it.
    ///
    /// # Errors
    /// - [`SyncError::AccessDenied`] when chat is disabled or the viewer is
    ///   banned. No list call is made and no timer is started.
    /// - [`SyncError::Api`] when the access metadata cannot be fetched.
    #[instrument(name = "session.start", skip(api, settings))]
    pub async fn start(
        api: Arc<dyn StreamApi>,
        settings: SyncSettings,
        subject: SubjectId,
        viewer: Option<ViewerId>,
    ) -> SyncResult<Self> {
        let access = AccessGate::new(Arc::clone(&api))
            .evaluate(subject, viewer)
            .await?;
        access.ensure_open()?;

        let messages = Arc::new(MessagePageStore::new(
            Arc::clone(&api),
            subject,
            settings.page_size,
        ));
        let replies = Arc::new(ReplyBucketStore::new(
            Arc::clone(&api),
            settings.reply_page_size,
        ));
        let mutations = MutationLayer::new(api, Arc::clone(&messages), Arc::clone(&replies));
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        let (viewport, viewport_rx) = watch::channel(ViewportMetrics::default());

        match messages.load_initial().await {
            Ok(FetchOutcome::Applied(delta)) => {
                info!(count = delta.fetched, "initial page loaded");
                let _ = events.send(SyncEvent::InitialLoaded {
                    subject,
                    count: delta.fetched,
                });
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "initial load failed; polling will retry");
                let _ = events.send(SyncEvent::FetchFailed {
                    store: StoreKind::Messages,
                    message: err.to_string(),
                });
            }
        }

        let scheduler = FetchScheduler::new(
            Arc::clone(&messages),
            viewport_rx,
            events.clone(),
            settings.scheduler,
        )
        .spawn(CancellationToken::new());

        Ok(Self {
            subject,
            access,
            messages,
            replies,
            mutations,
            events,
            viewport,
            scheduler,
        })
    }

    /// Subject this session synchronizes.
    #[must_use]
    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    /// Access flags evaluated at start.
    #[must_use]
    pub fn access(&self) -> StreamAccess {
        self.access
    }

    /// The top-level message store.
    #[must_use]
    pub fn messages(&self) -> &Arc<MessagePageStore> {
        &self.messages
    }

    /// The reply bucket store.
    #[must_use]
    pub fn replies(&self) -> &Arc<ReplyBucketStore> {
        &self.replies
    }

    /// Likes and posts for this subject.
    #[must_use]
    pub fn mutations(&self) -> &MutationLayer {
        &self.mutations
    }

    /// Subscribes to this session's events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Feeds the latest scroll geometry to the scheduler.
    pub fn report_viewport(&self, metrics: ViewportMetrics) {
        self.viewport.send_replace(metrics);
    }

    fn publish(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    async fn publish_replies(
        &self,
        parent: MessageId,
        result: SyncResult<FetchOutcome>,
    ) -> SyncResult<FetchOutcome> {
        match &result {
            Ok(FetchOutcome::Applied(delta)) => {
                let exhausted = self
                    .replies
                    .snapshot(parent)
                    .await
                    .is_some_and(|bucket| !bucket.has_more);
                self.publish(SyncEvent::RepliesLoaded {
                    parent_id: parent,
                    inserted: delta.inserted.clone(),
                    exhausted,
                });
            }
            Ok(_) => {}
            Err(err) => self.publish(SyncEvent::FetchFailed {
                store: StoreKind::Replies(parent),
                message: err.to_string(),
            }),
        }
        result
    }

    /// # Errors
    /// See [`ReplyBucketStore::open`].
    pub async fn open_replies(&self, parent: MessageId) -> SyncResult<FetchOutcome> {
        let result = self.replies.open(parent).await;
        self.publish_replies(parent, result).await
    }

    /// Collapses a reply bucket, keeping its items.
    pub async fn close_replies(&self, parent: MessageId) {
        self.replies.close(parent).await;
    }

    /// # Errors
    /// See [`ReplyBucketStore::load_more`].
    pub async fn load_more_replies(
        &self,
        parent: MessageId,
        page: Option<u32>,
    ) -> SyncResult<FetchOutcome> {
        let result = self.replies.load_more(parent, page).await;
        self.publish_replies(parent, result).await
    }

    /// # Errors
    /// See [`ReplyBucketStore::refresh`].
    pub async fn refresh_replies(&self, parent: MessageId) -> SyncResult<FetchOutcome> {
        let result = self.replies.refresh(parent).await;
        self.publish_replies(parent, result).await
    }

    /// # Errors
    /// See [`MutationLayer::toggle_like`].
    pub async fn toggle_like(&self, id: MessageId) -> SyncResult<LikeState> {
        self.mutations.toggle_like(id).await
    }

    /// # Errors
    /// See [`MutationLayer::post_message`].
    pub async fn post_message(
        &self,
        content: &str,
        parent: Option<MessageId>,
    ) -> SyncResult<Message> {
        self.mutations.post_message(content, parent).await
    }

    /// Stops the scheduler and discards every response still in flight.
    #[instrument(name = "session.dispose", skip(self), fields(subject = %self.subject))]
    pub async fn dispose(&self) {
        self.scheduler.dispose();
        self.messages.dispose().await;
        self.replies.dispose().await;
        self.publish(SyncEvent::Disposed {
            subject: self.subject,
        });
        info!("stream session disposed");
    }
}

/// Holds the session for the subject currently on screen.
pub struct Synchronizer {
    api: Arc<dyn StreamApi>,
    settings: SyncSettings,
    viewer: Option<ViewerId>,
    current: Option<StreamSession>,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("settings", &self.settings)
            .field("viewer", &self.viewer)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl Synchronizer {
    /// Creates a synchronizer with no active session.
    pub fn new(api: Arc<dyn StreamApi>, settings: SyncSettings, viewer: Option<ViewerId>) -> Self {
        Self {
            api,
            settings,
            viewer,
            current: None,
        }
    }

    /// The active session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&StreamSession> {
        self.current.as_ref()
    }

    /// Makes `subject` the active subject. Switching to the subject already
    /// active is a no-op; otherwise the old session is disposed before the
    /// new one is gated and started.
    ///
    /// # Errors
    /// Propagates [`StreamSession::start`] errors; no session is active
    /// afterwards.
    pub async fn switch_subject(&mut self, subject: SubjectId) -> SyncResult<&StreamSession> {
        let unchanged = self
            .current
            .as_ref()
            .is_some_and(|session| session.subject() == subject);
        if !unchanged {
            self.close().await;
            let session =
                StreamSession::start(Arc::clone(&self.api), self.settings, subject, self.viewer)
                    .await?;
            self.current = Some(session);
        }
        self.current.as_ref().ok_or(SyncError::Disposed)
    }

    /// Disposes the active session, if any.
    pub async fn close(&mut self) {
        if let Some(session) = self.current.take() {
            session.dispose().await;
        }
    }
}
