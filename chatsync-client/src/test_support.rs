//! In-memory stream server used by the unit tests.
//!
//! Messages are kept oldest→newest. Page `p` of size `n` is the `p`-th block
//! of `n` counted back from the newest message, returned in display order.
//! Replies page forward from the oldest.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use shared::models::{
    Author, LikeState, Message, MessageId, MessageKind, MessagePage, StreamAccessResponse,
    SubjectId, Timestamp,
};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::{api::StreamApi, error::ApiError};

pub(crate) fn mid(n: u128) -> MessageId {
    MessageId(Uuid::from_u128(n))
}

pub(crate) fn subject() -> SubjectId {
    SubjectId(Uuid::from_u128(0x51))
}

pub(crate) fn top(n: u128) -> Message {
    Message {
        id: mid(n),
        kind: MessageKind::Top,
        author: Author {
            first_name: Some(format!("user{n}")),
            last_name: None,
            label: String::new(),
        },
        content: format!("message {n}"),
        created_at: Timestamp::now(),
        like_count: 0,
        viewer_has_liked: false,
        reply_count: 0,
    }
}

pub(crate) fn reply(n: u128, parent: u128) -> Message {
    Message {
        kind: MessageKind::Reply {
            parent_id: mid(parent),
        },
        content: format!("reply {n} to {parent}"),
        ..top(n)
    }
}

pub(crate) fn ids(messages: &[Message]) -> Vec<u128> {
    messages.iter().map(|message| message.id.0.as_u128()).collect()
}

/// Operation selector for gates, failures and the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Messages,
    Replies(MessageId),
    Post,
    Like(MessageId),
    Access,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Messages { subject: SubjectId, page: u32, page_size: usize },
    Replies { parent: MessageId, page: u32 },
    Post { parent: Option<MessageId> },
    Like(MessageId),
    Access(SubjectId),
}

#[derive(Default)]
struct FakeState {
    messages: Vec<Message>,
    replies: HashMap<MessageId, Vec<Message>>,
    access: StreamAccessResponse,
    like_responses: VecDeque<Result<LikeState, u16>>,
    failures: HashMap<Op, usize>,
    gates: HashMap<Op, Arc<Semaphore>>,
    calls: Vec<Call>,
    next_id: u128,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub(crate) fn with_messages(count: u128) -> Arc<Self> {
        let api = Arc::new(Self::default());
        {
            let mut state = api.state.lock().unwrap();
            state.messages = (1..=count).map(top).collect();
            state.next_id = 10_000;
        }
        api
    }

    pub(crate) fn push_messages(&self, range: std::ops::RangeInclusive<u128>) {
        self.state.lock().unwrap().messages.extend(range.map(top));
    }

    pub(crate) fn set_replies(&self, parent: u128, range: std::ops::RangeInclusive<u128>) {
        let mut state = self.state.lock().unwrap();
        let items: Vec<Message> = range.map(|n| reply(n, parent)).collect();
        if let Some(message) = state.messages.iter_mut().find(|m| m.id == mid(parent)) {
            message.reply_count = items.len() as u64;
        }
        state.replies.insert(mid(parent), items);
    }

    pub(crate) fn set_access(&self, access: StreamAccessResponse) {
        self.state.lock().unwrap().access = access;
    }

    /// Queues the result of the next like call. `Err(status)` fails it.
    pub(crate) fn queue_like(&self, result: Result<LikeState, u16>) {
        self.state.lock().unwrap().like_responses.push_back(result);
    }

    pub(crate) fn fail_next(&self, op: Op) {
        *self.state.lock().unwrap().failures.entry(op).or_default() += 1;
    }

    /// Holds the next call matching `op` until a permit is added.
    pub(crate) fn hold_next(&self, op: Op) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.state
            .lock()
            .unwrap()
            .gates
            .insert(op, Arc::clone(&gate));
        gate
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    fn enter(&self, op: Op, call: Call) -> (Option<Arc<Semaphore>>, bool) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        let gate = state.gates.remove(&op);
        let fail = match state.failures.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        (gate, fail)
    }

    async fn pass(gate: Option<Arc<Semaphore>>) {
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }
    }

    fn unavailable() -> ApiError {
        ApiError::status(503, "service unavailable")
    }
}

#[async_trait]
impl StreamApi for FakeApi {
    async fn list_messages(
        &self,
        subject: SubjectId,
        page: u32,
        page_size: usize,
    ) -> Result<MessagePage, ApiError> {
        let (gate, fail) = self.enter(
            Op::Messages,
            Call::Messages {
                subject,
                page,
                page_size,
            },
        );
        Self::pass(gate).await;
        if fail {
            return Err(Self::unavailable());
        }

        let state = self.state.lock().unwrap();
        let skip = (page as usize - 1) * page_size;
        let end = state.messages.len().saturating_sub(skip);
        let start = end.saturating_sub(page_size);
        Ok(MessagePage {
            items: state.messages[start..end].to_vec(),
        })
    }

    async fn list_replies(
        &self,
        message: MessageId,
        page: u32,
        page_size: usize,
    ) -> Result<MessagePage, ApiError> {
        let (gate, fail) = self.enter(
            Op::Replies(message),
            Call::Replies {
                parent: message,
                page,
            },
        );
        Self::pass(gate).await;
        if fail {
            return Err(Self::unavailable());
        }

        let state = self.state.lock().unwrap();
        let all = state.replies.get(&message).cloned().unwrap_or_default();
        let start = ((page as usize - 1) * page_size).min(all.len());
        let end = (start + page_size).min(all.len());
        Ok(MessagePage {
            items: all[start..end].to_vec(),
        })
    }

    async fn post_message(
        &self,
        _subject: SubjectId,
        content: &str,
        parent: Option<MessageId>,
    ) -> Result<Message, ApiError> {
        let (gate, fail) = self.enter(Op::Post, Call::Post { parent });
        Self::pass(gate).await;
        if fail {
            return Err(ApiError::status(422, "rejected"));
        }

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        let mut message = match parent {
            Some(parent_id) => {
                let mut created = reply(id, parent_id.0.as_u128());
                created.kind = MessageKind::Reply { parent_id };
                created
            }
            None => top(id),
        };
        message.content = content.to_string();

        match parent {
            Some(parent_id) => {
                if let Some(parent) = state.messages.iter_mut().find(|m| m.id == parent_id) {
                    parent.reply_count += 1;
                }
                state
                    .replies
                    .entry(parent_id)
                    .or_default()
                    .push(message.clone());
            }
            None => state.messages.push(message.clone()),
        }
        Ok(message)
    }

    async fn toggle_like(&self, message: MessageId) -> Result<LikeState, ApiError> {
        let (gate, fail) = self.enter(Op::Like(message), Call::Like(message));
        let queued = self.state.lock().unwrap().like_responses.pop_front();
        Self::pass(gate).await;
        if fail {
            return Err(Self::unavailable());
        }

        match queued {
            Some(Ok(state)) => Ok(state),
            Some(Err(status)) => Err(ApiError::status(status, "like rejected")),
            None => {
                let mut state = self.state.lock().unwrap();
                let FakeState {
                    messages, replies, ..
                } = &mut *state;
                let target = messages
                    .iter_mut()
                    .chain(replies.values_mut().flatten())
                    .find(|m| m.id == message)
                    .ok_or_else(|| ApiError::status(404, "no such message"))?;
                target.viewer_has_liked = !target.viewer_has_liked;
                if target.viewer_has_liked {
                    target.like_count += 1;
                } else {
                    target.like_count = target.like_count.saturating_sub(1);
                }
                Ok(target.like_state())
            }
        }
    }

    async fn stream_access(&self, subject: SubjectId) -> Result<StreamAccessResponse, ApiError> {
        let (gate, fail) = self.enter(Op::Access, Call::Access(subject));
        Self::pass(gate).await;
        if fail {
            return Err(Self::unavailable());
        }
        Ok(self.state.lock().unwrap().access.clone())
    }
}
