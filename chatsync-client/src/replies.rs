//! Per-message reply buckets.
//!
//! Buckets are created lazily on first open or first reply and live as long
//! as the store. Each bucket has its own busy flag, so fetches for different
//! parents interleave freely while a single bucket never has two in flight.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use shared::models::{Message, MessageId};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::{
    api::StreamApi,
    error::SyncError,
    guard::BusyFlag,
    page_store::{FetchOutcome, PageDelta, SkipReason},
    reconcile::dedupe_against,
};

const STORE_LABEL: &str = "replies";

/// Rendering phase of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketPhase {
    /// Collapsed by the viewer; items are kept.
    Closed,
    /// A page fetch is in flight.
    Loading,
    /// Open with more pages on the server.
    Partial,
    /// Open and every page has been loaded.
    Exhausted,
}

/// Point-in-time copy of one bucket.
#[derive(Debug, Clone)]
pub struct BucketSnapshot {
    /// The top-level message the replies belong to.
    pub parent_id: MessageId,
    /// Replies in server order.
    pub items: Vec<Message>,
    /// Next page `load_more` will request.
    pub next_page: u32,
    /// Whether the last page came back full.
    pub has_more: bool,
    /// Whether the thread is expanded.
    pub open: bool,
    /// Whether a fetch is in flight.
    pub loading: bool,
    /// Message of the last failed fetch, cleared by the next success.
    pub error: Option<String>,
}

impl BucketSnapshot {
    /// Derives the rendering phase from the flags.
    #[must_use]
    pub fn phase(&self) -> BucketPhase {
        if !self.open {
            BucketPhase::Closed
        } else if self.loading {
            BucketPhase::Loading
        } else if self.has_more {
            BucketPhase::Partial
        } else {
            BucketPhase::Exhausted
        }
    }
}

#[derive(Debug)]
struct Bucket {
    items: Vec<Message>,
    next_page: u32,
    has_more: bool,
    open: bool,
    /// Set once any page has been applied. Replies posted before that are
    /// placeholders and give way to the first server page.
    fetched: bool,
    error: Option<String>,
    epoch: u64,
    busy: BusyFlag,
}

impl Default for Bucket {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_page: 1,
            has_more: true,
            open: false,
            fetched: false,
            error: None,
            epoch: 0,
            busy: BusyFlag::default(),
        }
    }
}

impl Bucket {
    fn snapshot(&self, parent_id: MessageId) -> BucketSnapshot {
        BucketSnapshot {
            parent_id,
            items: self.items.clone(),
            next_page: self.next_page,
            has_more: self.has_more,
            open: self.open,
            loading: self.busy.is_busy(),
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct BucketMap {
    buckets: HashMap<MessageId, Bucket>,
    disposed: bool,
}

/// Store of reply buckets keyed by parent message id.
pub struct ReplyBucketStore {
    api: Arc<dyn StreamApi>,
    page_size: usize,
    state: RwLock<BucketMap>,
}

impl std::fmt::Debug for ReplyBucketStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyBucketStore")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

/// Which page a fetch requests.
#[derive(Debug, Clone, Copy)]
enum Cursor {
    /// Page 1, regardless of exhaustion. Used by `open` and `refresh`.
    First,
    /// An explicit page, or the bucket's next page.
    More(Option<u32>),
}

impl ReplyBucketStore {
    /// Creates an empty store fetching `page_size` replies per page.
    pub fn new(api: Arc<dyn StreamApi>, page_size: usize) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
            state: RwLock::new(BucketMap::default()),
        }
    }

    /// Replies requested per page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Marks the bucket open and loads page 1 if nothing was fetched yet.
    ///
    /// # Errors
    /// Returns [`SyncError::Api`] when the first page fails to load; the
    /// bucket stays open with its error recorded.
    #[instrument(name = "replies.open", skip(self), fields(parent = %parent))]
    pub async fn open(&self, parent: MessageId) -> Result<FetchOutcome, SyncError> {
        let needs_fetch = {
            let mut state = self.state.write().await;
            if state.disposed {
                return Ok(FetchOutcome::Skipped(SkipReason::Disposed));
            }
            let bucket = state.buckets.entry(parent).or_default();
            bucket.open = true;
            !bucket.fetched
        };
        if needs_fetch {
            self.fetch(parent, Cursor::First).await
        } else {
            Ok(FetchOutcome::Skipped(SkipReason::AlreadyLoaded))
        }
    }

    /// Collapses the bucket. Items are kept for the next open.
    pub async fn close(&self, parent: MessageId) {
        if let Some(bucket) = self.state.write().await.buckets.get_mut(&parent) {
            bucket.open = false;
        }
    }

    /// Fetches `page`, or the bucket's next page, and appends it.
    ///
    /// Once the bucket is exhausted this is a no-op returning
    /// [`SkipReason::Exhausted`], even for an explicit page.
    ///
    /// # Errors
    /// Returns [`SyncError::Api`] when the fetch fails; items and cursor are
    /// left untouched.
    #[instrument(name = "replies.load_more", skip(self), fields(parent = %parent))]
    pub async fn load_more(
        &self,
        parent: MessageId,
        page: Option<u32>,
    ) -> Result<FetchOutcome, SyncError> {
        self.fetch(parent, Cursor::More(page)).await
    }

    /// Resets the bucket to empty and reloads page 1.
    ///
    /// Any fetch already in flight for this bucket is abandoned: its busy
    /// flag is replaced and its response will be discarded.
    ///
    /// # Errors
    /// Returns [`SyncError::Api`] when the reload fails.
    #[instrument(name = "replies.refresh", skip(self), fields(parent = %parent))]
    pub async fn refresh(&self, parent: MessageId) -> Result<FetchOutcome, SyncError> {
        {
            let mut state = self.state.write().await;
            if state.disposed {
                return Ok(FetchOutcome::Skipped(SkipReason::Disposed));
            }
            let bucket = state.buckets.entry(parent).or_default();
            let epoch = bucket.epoch + 1;
            let open = bucket.open;
            *bucket = Bucket {
                open,
                epoch,
                ..Bucket::default()
            };
        }
        self.fetch(parent, Cursor::First).await
    }

    async fn fetch(&self, parent: MessageId, cursor: Cursor) -> Result<FetchOutcome, SyncError> {
        let (_guard, page, epoch) = {
            let mut state = self.state.write().await;
            if state.disposed {
                return Ok(FetchOutcome::Skipped(SkipReason::Disposed));
            }
            let bucket = state.buckets.entry(parent).or_default();
            let page = match cursor {
                Cursor::First => 1,
                Cursor::More(_) if !bucket.has_more => {
                    return Ok(FetchOutcome::Skipped(SkipReason::Exhausted));
                }
                Cursor::More(page) => page.unwrap_or(bucket.next_page),
            };
            let Some(guard) = bucket.busy.try_acquire() else {
                return Ok(FetchOutcome::Skipped(SkipReason::Busy));
            };
            (guard, page, bucket.epoch)
        };

        counter!("chatsync_fetch_total", "store" => STORE_LABEL).increment(1);
        let result = self.api.list_replies(parent, page, self.page_size).await;

        let mut state = self.state.write().await;
        let disposed = state.disposed;
        let Some(bucket) = state
            .buckets
            .get_mut(&parent)
            .filter(|bucket| !disposed && bucket.epoch == epoch)
        else {
            counter!("chatsync_stale_responses_total").increment(1);
            debug!(page, "discarding reply page for a reset bucket");
            return Ok(FetchOutcome::Discarded);
        };

        match result {
            Ok(fresh) => {
                if !bucket.fetched {
                    bucket.items.clear();
                }
                let fetched = fresh.items.len();
                let inserted = dedupe_against(&bucket.items, fresh.items);
                bucket.items.extend(inserted.iter().cloned());
                bucket.next_page = page + 1;
                bucket.has_more = fetched == self.page_size;
                bucket.fetched = true;
                bucket.error = None;
                debug!(page, fetched, has_more = bucket.has_more, "reply page applied");
                Ok(FetchOutcome::Applied(PageDelta { fetched, inserted }))
            }
            Err(err) => {
                counter!("chatsync_fetch_failures_total", "store" => STORE_LABEL).increment(1);
                warn!(error = %err, page, "reply fetch failed");
                bucket.error = Some(err.to_string());
                Err(SyncError::Api(err))
            }
        }
    }

    /// Appends a server-confirmed reply to its parent's bucket, creating the
    /// bucket if needed. Returns `false` for a duplicate id.
    ///
    /// In a bucket that was never fetched the reply is shown until the first
    /// page arrives, which then replaces it.
    pub async fn append_reply(&self, parent: MessageId, reply: Message) -> bool {
        let mut state = self.state.write().await;
        if state.disposed {
            return false;
        }
        let bucket = state.buckets.entry(parent).or_default();
        if bucket.items.iter().any(|existing| existing.id == reply.id) {
            return false;
        }
        bucket.items.push(reply);
        true
    }

    /// Looks a reply up across all buckets.
    pub async fn get_reply(&self, id: MessageId) -> Option<Message> {
        self.state
            .read()
            .await
            .buckets
            .values()
            .flat_map(|bucket| bucket.items.iter())
            .find(|reply| reply.id == id)
            .cloned()
    }

    /// Applies `update` to the reply with `id` in whichever bucket holds it.
    pub async fn update_reply<R>(
        &self,
        id: MessageId,
        update: impl FnOnce(&mut Message) -> R,
    ) -> Option<R> {
        let mut state = self.state.write().await;
        state
            .buckets
            .values_mut()
            .flat_map(|bucket| bucket.items.iter_mut())
            .find(|reply| reply.id == id)
            .map(update)
    }

    /// Copies one bucket, or `None` if it was never created.
    pub async fn snapshot(&self, parent: MessageId) -> Option<BucketSnapshot> {
        self.state
            .read()
            .await
            .buckets
            .get(&parent)
            .map(|bucket| bucket.snapshot(parent))
    }

    /// Whether `parent`'s bucket has a fetch in flight.
    pub async fn is_loading(&self, parent: MessageId) -> bool {
        self.state
            .read()
            .await
            .buckets
            .get(&parent)
            .is_some_and(|bucket| bucket.busy.is_busy())
    }

    /// Drops all future and in-flight results.
    pub async fn dispose(&self) {
        self.state.write().await.disposed = true;
    }
}
