//! Plain-text rendering of messages for terminal output.

use chrono::{DateTime, Utc};
use client::{BucketSnapshot, PageSnapshot};
use shared::models::{LikeState, Message};

/// One line per message: age, author, content and counters. Replies are
/// indented and liked messages carry a `*` after the like count.
#[must_use]
pub fn message_line(message: &Message, now: DateTime<Utc>) -> String {
    let indent = if message.is_reply() { "    > " } else { "" };
    let liked = if message.viewer_has_liked { "*" } else { "" };
    let mut line = format!(
        "{indent}[{}] {}: {}  (likes {}{liked}",
        message.created_at.relative_to(now),
        message.author.display_name(),
        message.content.trim(),
        message.like_count,
    );
    if !message.is_reply() {
        line.push_str(&format!(", replies {}", message.reply_count));
    }
    line.push(')');
    line.push_str(&format!("  #{}", message.id));
    line
}

#[must_use]
pub fn page(snapshot: &PageSnapshot, now: DateTime<Utc>) -> String {
    let mut out: Vec<String> = Vec::with_capacity(snapshot.items.len() + 1);
    if snapshot.has_more {
        out.push("-- older messages available --".to_string());
    } else if snapshot.items.is_empty() {
        out.push("-- no messages yet --".to_string());
    } else {
        out.push("-- beginning of stream --".to_string());
    }
    out.extend(snapshot.items.iter().map(|message| message_line(message, now)));
    out.join("\n")
}

#[must_use]
pub fn bucket(snapshot: &BucketSnapshot, now: DateTime<Utc>) -> String {
    let mut out: Vec<String> = snapshot
        .items
        .iter()
        .map(|reply| message_line(reply, now))
        .collect();
    if snapshot.items.is_empty() {
        out.push("    (no replies)".to_string());
    } else if snapshot.has_more {
        out.push("    (more replies available)".to_string());
    }
    out.join("\n")
}

#[must_use]
pub fn like_state(state: LikeState) -> String {
    if state.liked {
        format!("liked ({} likes)", state.likes)
    } else {
        format!("not liked ({} likes)", state.likes)
    }
}
