//! Stream access metadata.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ViewerId;

/// Stream metadata relevant to chat access, fetched once per subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct StreamAccessResponse {
    /// Whether the stream's chat feature is off.
    #[serde(default)]
    pub chat_disabled: bool,
    /// Viewers refused access to this stream.
    #[serde(default)]
    pub banned_viewer_ids: Vec<ViewerId>,
}

impl StreamAccessResponse {
    /// Whether `viewer` appears in the ban list. Anonymous viewers are never
    /// banned by id.
    #[must_use]
    pub fn is_banned(&self, viewer: Option<ViewerId>) -> bool {
        viewer.is_some_and(|viewer| self.banned_viewer_ids.contains(&viewer))
    }
}
