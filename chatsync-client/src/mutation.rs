//! Optimistic likes and server-confirmed posts.
//!
//! A like is applied locally before the request goes out, then overwritten
//! with the server's counts. If the request fails and nothing else touched
//! the message meanwhile, the previous values are restored. Failures are kept
//! per message id for inline display.

use std::{collections::HashMap, sync::Arc};

use metrics::counter;
use shared::models::{LikeState, Message, MessageId, SubjectId};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::{
    api::StreamApi,
    error::SyncError,
    page_store::MessagePageStore,
    replies::ReplyBucketStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Messages,
    Replies,
}

/// Flips the like flag and adjusts the count, returning the state before and
/// after the flip.
fn flip_like(message: &mut Message) -> (LikeState, LikeState) {
    let previous = message.like_state();
    message.viewer_has_liked = !previous.liked;
    message.like_count = if message.viewer_has_liked {
        previous.likes + 1
    } else {
        previous.likes.saturating_sub(1)
    };
    (previous, message.like_state())
}

/// Writes likes and posts into whichever store owns the message.
pub struct MutationLayer {
    api: Arc<dyn StreamApi>,
    subject: SubjectId,
    messages: Arc<MessagePageStore>,
    replies: Arc<ReplyBucketStore>,
    errors: RwLock<HashMap<MessageId, String>>,
}

impl std::fmt::Debug for MutationLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationLayer")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl MutationLayer {
    /// Creates a layer writing into `messages` and `replies`.
    pub fn new(
        api: Arc<dyn StreamApi>,
        messages: Arc<MessagePageStore>,
        replies: Arc<ReplyBucketStore>,
    ) -> Self {
        Self {
            api,
            subject: messages.subject(),
            messages,
            replies,
            errors: RwLock::new(HashMap::new()),
        }
    }

    /// The latest mutation failure for `id`, cleared by the next success.
    pub async fn inline_error(&self, id: MessageId) -> Option<String> {
        self.errors.read().await.get(&id).cloned()
    }

    async fn set_error(&self, id: MessageId, err: &SyncError) {
        self.errors.write().await.insert(id, err.to_string());
    }

    async fn clear_error(&self, id: MessageId) {
        self.errors.write().await.remove(&id);
    }

    async fn ensure_live(&self) -> Result<(), SyncError> {
        if self.messages.is_disposed().await {
            Err(SyncError::Disposed)
        } else {
            Ok(())
        }
    }

    async fn apply(&self, owner: Owner, id: MessageId, update: impl FnOnce(&mut Message)) {
        match owner {
            Owner::Messages => self.messages.update(id, update).await,
            Owner::Replies => self.replies.update_reply(id, update).await,
        };
    }

    /// Toggles the viewer's like on a top-level message or a reply.
    ///
    /// On success the message carries exactly the server-returned count and
    /// flag. When several toggles overlap, the last response to arrive wins.
    ///
    /// # Errors
    /// - [`SyncError::UnknownMessage`] when no store holds `id`; nothing is
    ///   sent.
    /// - [`SyncError::Api`] when the request fails; the optimistic flip is
    ///   undone unless a later toggle already changed the message.
    #[instrument(name = "mutation.toggle_like", skip(self), fields(subject = %self.subject))]
    pub async fn toggle_like(&self, id: MessageId) -> Result<LikeState, SyncError> {
        self.ensure_live().await?;

        let (owner, (previous, optimistic)) = match self.messages.update(id, flip_like).await {
            Some(flip) => (Owner::Messages, flip),
            None => match self.replies.update_reply(id, flip_like).await {
                Some(flip) => (Owner::Replies, flip),
                None => return Err(SyncError::UnknownMessage(id)),
            },
        };
        debug!(?previous, ?optimistic, "like applied optimistically");

        match self.api.toggle_like(id).await {
            Ok(server) => {
                self.apply(owner, id, |message| message.apply_like_state(&server))
                    .await;
                self.clear_error(id).await;
                Ok(server)
            }
            Err(err) => {
                let mut rolled_back = false;
                self.apply(owner, id, |message| {
                    if message.like_state() == optimistic {
                        message.apply_like_state(&previous);
                        rolled_back = true;
                    }
                })
                .await;
                if rolled_back {
                    counter!("chatsync_like_rollbacks_total").increment(1);
                }
                warn!(error = %err, rolled_back, "like toggle failed");
                let err = SyncError::Api(err);
                self.set_error(id, &err).await;
                Err(err)
            }
        }
    }

    /// Posts a top-level message, or a reply when `parent` is set.
    ///
    /// The server's copy is inserted with its real id: a reply at the end of
    /// its parent's bucket (bumping the parent's reply count), a top-level
    /// message at the newest end of the list. Replying to a reply attaches
    /// to that reply's top-level parent.
    ///
    /// # Errors
    /// - [`SyncError::EmptyContent`] for blank content; nothing is sent.
    /// - [`SyncError::Api`] when the server rejects the post. For replies the
    ///   failure is also recorded as the parent's inline error.
    #[instrument(name = "mutation.post_message", skip(self, content), fields(subject = %self.subject))]
    pub async fn post_message(
        &self,
        content: &str,
        parent: Option<MessageId>,
    ) -> Result<Message, SyncError> {
        if content.trim().is_empty() {
            return Err(SyncError::EmptyContent);
        }
        self.ensure_live().await?;

        let parent = match parent {
            Some(id) => Some(
                self.replies
                    .get_reply(id)
                    .await
                    .and_then(|reply| reply.parent_id())
                    .unwrap_or(id),
            ),
            None => None,
        };

        let created = match self.api.post_message(self.subject, content, parent).await {
            Ok(created) => created,
            Err(err) => {
                warn!(error = %err, "post rejected");
                let err = SyncError::Api(err);
                if let Some(parent) = parent {
                    self.set_error(parent, &err).await;
                }
                return Err(err);
            }
        };

        match parent {
            Some(parent) => {
                if self.replies.append_reply(parent, created.clone()).await {
                    self.messages
                        .update(parent, |message| message.reply_count += 1)
                        .await;
                }
                self.clear_error(parent).await;
            }
            None => {
                self.messages.append_confirmed(created.clone()).await;
            }
        }
        debug!(message_id = %created.id, "post confirmed");
        Ok(created)
    }
}
