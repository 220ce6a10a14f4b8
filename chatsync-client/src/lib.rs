#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(missing_docs, clippy::pedantic)]

//! Stream synchronizer core for `ChatSync`.
//!
//! A [`StreamSession`] reconciles a server-authoritative, paged message log
//! for one subject against local state: it gates on stream access, loads the
//! newest page, polls for new messages while the viewer sits at the bottom,
//! pages backwards when the viewer reaches the top, lazily loads reply
//! buckets and applies optimistic likes. [`Synchronizer`] swaps sessions
//! when the subject changes.

pub mod access;
pub mod api;
pub mod error;
pub mod events;
pub mod mutation;
pub mod page_store;
pub mod replies;
pub mod scheduler;
pub mod session;
pub mod viewport;

mod guard;
mod reconcile;

#[cfg(test)]
mod test_support;

pub use access::{AccessGate, StreamAccess};
pub use api::{HttpStreamApi, StreamApi};
pub use error::{AccessDenial, ApiError, SyncError, SyncResult};
pub use events::{StoreKind, SyncEvent};
pub use mutation::MutationLayer;
pub use page_store::{FetchOutcome, MessagePageStore, PageDelta, PageSnapshot, SkipReason};
pub use replies::{BucketPhase, BucketSnapshot, ReplyBucketStore};
pub use scheduler::{FetchScheduler, SchedulerConfig, SchedulerHandle, TriggerOutcome};
pub use session::{StreamSession, SyncSettings, Synchronizer};
pub use viewport::{ScrollAnchor, ViewportMetrics};
