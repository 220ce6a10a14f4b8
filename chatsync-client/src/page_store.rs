//! Ordered top-level messages for one subject.
//!
//! The list is kept in display order: oldest at the front, newest at the
//! back. Page 1 is the newest page; older pages are prepended as the viewer
//! scrolls up. One busy guard covers every fetch this store issues, so a poll
//! refresh and a backward page can never overlap.

use std::sync::Arc;

use metrics::counter;
use shared::models::{Message, MessageId, MessagePage, SubjectId};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::{
    api::StreamApi,
    error::{ApiError, SyncError},
    guard::BusyFlag,
    reconcile::{dedupe_against, splice_newest},
};

const STORE_LABEL: &str = "messages";

/// Why a fetch request did not reach the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another fetch for the same store or bucket is in flight.
    Busy,
    /// The last page observed was short; there is nothing older.
    Exhausted,
    /// `load_older` was asked for before any page was loaded.
    NotLoaded,
    /// The bucket already holds fetched replies; nothing to do on open.
    AlreadyLoaded,
    /// The owning session was disposed.
    Disposed,
}

/// Items applied by a successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDelta {
    /// Raw item count returned by the server for this page.
    pub fetched: usize,
    /// Items that were not present before, in display order.
    pub inserted: Vec<Message>,
}

/// What happened to a fetch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was fetched and merged.
    Applied(PageDelta),
    /// No request was sent.
    Skipped(SkipReason),
    /// The response arrived after a reset or dispose and was dropped.
    Discarded,
}

impl FetchOutcome {
    /// Whether a page was merged.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Point-in-time copy of the store, for rendering.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    /// Messages oldest first, in server order.
    pub items: Vec<Message>,
    /// Whether older pages may exist.
    pub has_more: bool,
    /// Whether a fetch is in flight.
    pub loading: bool,
    /// Whether any page has been applied.
    pub initialized: bool,
    /// Message of the last failed fetch, cleared by the next success.
    pub error: Option<String>,
}

#[derive(Debug)]
struct PageState {
    items: Vec<Message>,
    /// Next older page to request.
    next_page: u32,
    has_more: bool,
    initialized: bool,
    error: Option<String>,
    epoch: u64,
    disposed: bool,
}

impl PageState {
    fn accepts(&self, epoch: u64) -> bool {
        !self.disposed && self.epoch == epoch
    }

    fn replace(&mut self, items: Vec<Message>, fetched: usize, page_size: usize) {
        self.items = items;
        self.next_page = 2;
        self.has_more = fetched == page_size;
        self.initialized = true;
        self.error = None;
    }

    fn fail(&mut self, err: ApiError) -> SyncError {
        counter!("chatsync_fetch_failures_total", "store" => STORE_LABEL).increment(1);
        warn!(error = %err, "message fetch failed");
        self.error = Some(err.to_string());
        SyncError::Api(err)
    }
}

/// Store for the top-level messages of one subject.
pub struct MessagePageStore {
    api: Arc<dyn StreamApi>,
    subject: SubjectId,
    page_size: usize,
    busy: BusyFlag,
    state: RwLock<PageState>,
}

impl std::fmt::Debug for MessagePageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePageStore")
            .field("subject", &self.subject)
            .field("page_size", &self.page_size)
            .field("busy", &self.busy.is_busy())
            .finish_non_exhaustive()
    }
}

impl MessagePageStore {
    /// Creates an empty store. `page_size` is fixed for the store's lifetime.
    pub fn new(api: Arc<dyn StreamApi>, subject: SubjectId, page_size: usize) -> Self {
        Self {
            api,
            subject,
            page_size: page_size.max(1),
            busy: BusyFlag::default(),
            state: RwLock::new(PageState {
                items: Vec::new(),
                next_page: 1,
                has_more: true,
                initialized: false,
                error: None,
                epoch: 0,
                disposed: false,
            }),
        }
    }

    /// Subject this store belongs to.
    #[must_use]
    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    /// Messages requested per page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Whether `load_older` may still find older messages.
    pub async fn has_more(&self) -> bool {
        self.state.read().await.has_more
    }

    /// Copies the current state for rendering.
    pub async fn snapshot(&self) -> PageSnapshot {
        let state = self.state.read().await;
        PageSnapshot {
            items: state.items.clone(),
            has_more: state.has_more,
            loading: self.busy.is_busy(),
            initialized: state.initialized,
            error: state.error.clone(),
        }
    }

    async fn fetch(&self, page: u32) -> Result<MessagePage, ApiError> {
        counter!("chatsync_fetch_total", "store" => STORE_LABEL).increment(1);
        self.api
            .list_messages(self.subject, page, self.page_size)
            .await
    }

    fn discard(page: u32) -> FetchOutcome {
        counter!("chatsync_stale_responses_total").increment(1);
        debug!(page, "discarding response for a reset or disposed store");
        FetchOutcome::Discarded
    }

    /// Fetches page 1 and replaces the whole list with it.
    ///
    /// # Errors
    /// Returns [`SyncError::Api`] when the fetch fails; the previous list and
    /// `has_more` are left untouched and the error is recorded on the store.
    #[instrument(name = "messages.load_initial", skip(self), fields(subject = %self.subject))]
    pub async fn load_initial(&self) -> Result<FetchOutcome, SyncError> {
        let Some(_guard) = self.busy.try_acquire() else {
            return Ok(FetchOutcome::Skipped(SkipReason::Busy));
        };
        let epoch = {
            let state = self.state.read().await;
            if state.disposed {
                return Ok(FetchOutcome::Skipped(SkipReason::Disposed));
            }
            state.epoch
        };

        let result = self.fetch(1).await;

        let mut state = self.state.write().await;
        if !state.accepts(epoch) {
            return Ok(Self::discard(1));
        }
        match result {
            Ok(page) => {
                let fetched = page.items.len();
                let items = dedupe_against(&[], page.items);
                let inserted = items.clone();
                state.replace(items, fetched, self.page_size);
                debug!(fetched, has_more = state.has_more, "initial page loaded");
                Ok(FetchOutcome::Applied(PageDelta { fetched, inserted }))
            }
            Err(err) => Err(state.fail(err)),
        }
    }

    /// Fetches the next older page and prepends it.
    ///
    /// A no-op while another fetch is in flight, before the first page has
    /// loaded, or once a short page has been seen.
    ///
    /// # Errors
    /// Returns [`SyncError::Api`] when the fetch fails; list, cursor and
    /// `has_more` are left untouched.
    #[instrument(name = "messages.load_older", skip(self), fields(subject = %self.subject))]
    pub async fn load_older(&self) -> Result<FetchOutcome, SyncError> {
        let Some(_guard) = self.busy.try_acquire() else {
            return Ok(FetchOutcome::Skipped(SkipReason::Busy));
        };
        let (page, epoch) = {
            let state = self.state.read().await;
            if state.disposed {
                return Ok(FetchOutcome::Skipped(SkipReason::Disposed));
            }
            if !state.initialized {
                return Ok(FetchOutcome::Skipped(SkipReason::NotLoaded));
            }
            if !state.has_more {
                return Ok(FetchOutcome::Skipped(SkipReason::Exhausted));
            }
            (state.next_page, state.epoch)
        };

        let result = self.fetch(page).await;

        let mut state = self.state.write().await;
        if !state.accepts(epoch) {
            return Ok(Self::discard(page));
        }
        match result {
            Ok(fresh) => {
                let fetched = fresh.items.len();
                let inserted = dedupe_against(&state.items, fresh.items);
                state.items.splice(0..0, inserted.iter().cloned());
                state.next_page = page + 1;
                state.has_more = fetched == self.page_size;
                state.error = None;
                debug!(page, fetched, has_more = state.has_more, "older page prepended");
                Ok(FetchOutcome::Applied(PageDelta { fetched, inserted }))
            }
            Err(err) => Err(state.fail(err)),
        }
    }

    /// Re-fetches page 1 and reconciles the newest region of the list.
    ///
    /// Before the first successful load this behaves like
    /// [`MessagePageStore::load_initial`], so polling retries a failed
    /// initial load.
    ///
    /// # Errors
    /// Returns [`SyncError::Api`] when the fetch fails.
    #[instrument(name = "messages.refresh_newest", skip(self), fields(subject = %self.subject))]
    pub async fn refresh_newest(&self) -> Result<FetchOutcome, SyncError> {
        let Some(_guard) = self.busy.try_acquire() else {
            return Ok(FetchOutcome::Skipped(SkipReason::Busy));
        };
        let epoch = {
            let state = self.state.read().await;
            if state.disposed {
                return Ok(FetchOutcome::Skipped(SkipReason::Disposed));
            }
            state.epoch
        };

        let result = self.fetch(1).await;

        let mut state = self.state.write().await;
        if !state.accepts(epoch) {
            return Ok(Self::discard(1));
        }
        match result {
            Ok(fresh) => {
                let fetched = fresh.items.len();
                let splice = splice_newest(&mut state.items, fresh.items);
                if !splice.overlapped || !state.initialized {
                    // No common id: the gap cannot be stitched, restart paging
                    // from the page we just received.
                    state.next_page = 2;
                    state.has_more = fetched == self.page_size;
                }
                state.initialized = true;
                state.error = None;
                debug!(
                    fetched,
                    inserted = splice.inserted.len(),
                    overlapped = splice.overlapped,
                    "newest page refreshed"
                );
                Ok(FetchOutcome::Applied(PageDelta {
                    fetched,
                    inserted: splice.inserted,
                }))
            }
            Err(err) => Err(state.fail(err)),
        }
    }

    /// Looks a loaded message up by id.
    pub async fn get(&self, id: MessageId) -> Option<Message> {
        self.state
            .read()
            .await
            .items
            .iter()
            .find(|message| message.id == id)
            .cloned()
    }

    /// Applies `update` to the message with `id`, if this store holds it.
    pub async fn update<R>(&self, id: MessageId, update: impl FnOnce(&mut Message) -> R) -> Option<R> {
        let mut state = self.state.write().await;
        state
            .items
            .iter_mut()
            .find(|message| message.id == id)
            .map(update)
    }

    /// Appends a server-confirmed message at the newest end. Returns `false`
    /// when the id is already present or the store is disposed.
    pub async fn append_confirmed(&self, message: Message) -> bool {
        let mut state = self.state.write().await;
        if state.disposed || state.items.iter().any(|existing| existing.id == message.id) {
            return false;
        }
        state.items.push(message);
        true
    }

    /// Drops all future and in-flight results.
    pub async fn dispose(&self) {
        let mut state = self.state.write().await;
        state.disposed = true;
        state.epoch += 1;
    }

    /// Whether [`Self::dispose`] has run.
    pub async fn is_disposed(&self) -> bool {
        self.state.read().await.disposed
    }
}
