//! Change notifications published by a session.

use shared::models::{Message, MessageId, SubjectId};

use crate::viewport::ScrollAnchor;

/// Which store a failed fetch belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// The top-level message list.
    Messages,
    /// The reply bucket under this parent.
    Replies(MessageId),
}

/// Something a host may want to re-render for.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The newest page replaced the list.
    InitialLoaded {
        /// Subject the page belongs to.
        subject: SubjectId,
        /// Items on the page.
        count: usize,
    },
    /// New items at the newest end after a poll.
    NewestRefreshed {
        /// Items that were not in the list before.
        inserted: Vec<Message>,
    },
    /// Older items were prepended. Apply `anchor.restore` after the next
    /// paint to keep the viewport still.
    OlderPrepended {
        /// Items added at the oldest end.
        inserted: Vec<Message>,
        /// Viewport captured before the fetch.
        anchor: ScrollAnchor,
        /// Whether the start of the stream has been reached.
        exhausted: bool,
    },
    /// A reply page was applied to a bucket.
    RepliesLoaded {
        /// Parent of the bucket.
        parent_id: MessageId,
        /// Replies appended to the bucket.
        inserted: Vec<Message>,
        /// Whether the bucket has no more pages.
        exhausted: bool,
    },
    /// A fetch failed; prior data is unchanged.
    FetchFailed {
        /// Store the fetch belonged to.
        store: StoreKind,
        /// Rendered error.
        message: String,
    },
    /// The session was torn down.
    Disposed {
        /// Subject of the disposed session.
        subject: SubjectId,
    },
}
