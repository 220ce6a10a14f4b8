//! Messages, pages and mutation bodies.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{MessageId, Timestamp};

/// Display identity of a message author.
///
/// Carries no ownership semantics; it only decides what name to print.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Author {
    /// Given name, if shared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name, if shared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Fallback label (handle, "Anonymous", ...) used when no name parts exist.
    #[serde(default)]
    pub label: String,
}

impl Author {
    /// Joins the non-empty name parts, falling back to the label.
    #[must_use]
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            if self.label.trim().is_empty() {
                "Anonymous".to_string()
            } else {
                self.label.trim().to_string()
            }
        } else {
            parts.join(" ")
        }
    }
}

/// Whether a message is a top-level line or a reply under one.
///
/// Replies are never re-nestable: `parent_id` always names a top-level
/// message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// A top-level line in the stream.
    Top,
    /// A reply in a top-level message's thread.
    Reply {
        /// The top-level message replied to.
        parent_id: MessageId,
    },
}

/// A comment or chat line, top-level or reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Message {
    /// Server-assigned id, the sole reconciliation key.
    pub id: MessageId,
    /// Top-level or reply.
    pub kind: MessageKind,
    /// Who wrote it.
    pub author: Author,
    /// Raw author text; escaping happens at the render boundary.
    pub content: String,
    /// Creation time, for display.
    pub created_at: Timestamp,
    /// Total likes.
    #[serde(default)]
    pub like_count: u64,
    /// Whether the current viewer liked it.
    #[serde(default)]
    pub viewer_has_liked: bool,
    /// Server-reported reply total. May lag the locally opened bucket.
    #[serde(default)]
    pub reply_count: u64,
}

impl Message {
    /// Whether this is a reply.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        matches!(self.kind, MessageKind::Reply { .. })
    }

    /// The parent of a reply, `None` for top-level messages.
    #[must_use]
    pub const fn parent_id(&self) -> Option<MessageId> {
        match self.kind {
            MessageKind::Top => None,
            MessageKind::Reply { parent_id } => Some(parent_id),
        }
    }

    /// Overwrites the like fields with authoritative server values.
    pub fn apply_like_state(&mut self, state: &LikeState) {
        self.like_count = state.likes;
        self.viewer_has_liked = state.liked;
    }

    /// Current like fields as a [`LikeState`].
    #[must_use]
    pub const fn like_state(&self) -> LikeState {
        LikeState {
            likes: self.like_count,
            liked: self.viewer_has_liked,
        }
    }
}

/// One page of messages. Page 1 is the most recent page; items inside a
/// page are in display order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct MessagePage {
    /// Messages on this page.
    pub items: Vec<Message>,
}

/// Body for posting a top-level message or, with `parent_id`, a reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PostMessageRequest {
    /// Message text.
    pub content: String,
    /// Top-level message to reply under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<MessageId>,
}

/// Authoritative like state returned by the toggle endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct LikeState {
    /// Total likes after the toggle.
    pub likes: u64,
    /// Whether the viewer now likes the message.
    pub liked: bool,
}
