//! Wire models of the stream API.

pub mod access;
pub mod errors;
pub mod ids;
pub mod message;
pub mod timestamp;

pub use access::StreamAccessResponse;
pub use errors::ErrorResponse;
pub use ids::{MessageId, SubjectId, ViewerId};
pub use message::{Author, LikeState, Message, MessageKind, MessagePage, PostMessageRequest};
pub use timestamp::Timestamp;
