//! Id-keyed merge rules shared by the page store and the reply buckets.
//!
//! Ids are the only reconciliation key. Server order is taken as-is; nothing
//! here sorts.

use std::collections::HashSet;

use shared::models::{Message, MessageId};

/// Drops incoming items whose id is already present, keeping server order.
pub(crate) fn dedupe_against(existing: &[Message], incoming: Vec<Message>) -> Vec<Message> {
    let mut seen: HashSet<MessageId> = existing.iter().map(|message| message.id).collect();
    incoming
        .into_iter()
        .filter(|message| seen.insert(message.id))
        .collect()
}

/// Result of splicing a freshly fetched newest page onto a list.
#[derive(Debug, Default)]
pub(crate) struct Splice {
    /// Items that were not present before the splice.
    pub(crate) inserted: Vec<Message>,
    /// Whether the fresh page overlapped the existing list. When it did not,
    /// the list was replaced wholesale.
    pub(crate) overlapped: bool,
}

/// Replaces the newest region of `items` with `fresh`.
///
/// The cut point is the earliest existing item that also appears in `fresh`;
/// everything from there on is server-replaced. Without any overlap the
/// fresh page becomes the whole list.
pub(crate) fn splice_newest(items: &mut Vec<Message>, fresh: Vec<Message>) -> Splice {
    let fresh = dedupe_against(&[], fresh);
    let previous: HashSet<MessageId> = items.iter().map(|message| message.id).collect();
    let fresh_ids: HashSet<MessageId> = fresh.iter().map(|message| message.id).collect();
    let inserted = fresh
        .iter()
        .filter(|message| !previous.contains(&message.id))
        .cloned()
        .collect();

    match items
        .iter()
        .position(|message| fresh_ids.contains(&message.id))
    {
        Some(cut) => {
            items.truncate(cut);
            items.extend(fresh);
            Splice {
                inserted,
                overlapped: true,
            }
        }
        None => {
            *items = fresh;
            Splice {
                inserted,
                overlapped: false,
            }
        }
    }
}
