//! One-shot access check run before a session starts.

use std::sync::Arc;

use shared::models::{SubjectId, ViewerId};
use tracing::{info, instrument};

use crate::{
    api::StreamApi,
    error::{AccessDenial, SyncError},
};

/// Access flags for one subject, fixed for the session's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamAccess {
    /// The stream's chat feature is off.
    pub chat_disabled: bool,
    /// The viewer appears on the ban list.
    pub viewer_banned: bool,
}

impl StreamAccess {
    /// The reason access is refused, if any. A disabled chat takes
    /// precedence over a ban.
    #[must_use]
    pub const fn denial(&self) -> Option<AccessDenial> {
        if self.chat_disabled {
            Some(AccessDenial::ChatDisabled)
        } else if self.viewer_banned {
            Some(AccessDenial::ViewerBanned)
        } else {
            None
        }
    }

    /// # Errors
    /// Returns [`SyncError::AccessDenied`] when chat is disabled or the
    /// viewer is banned.
    pub fn ensure_open(&self) -> Result<(), SyncError> {
        match self.denial() {
            Some(denial) => Err(SyncError::AccessDenied(denial)),
            None => Ok(()),
        }
    }
}

/// Fetches stream metadata and derives [`StreamAccess`].
#[derive(Clone)]
pub struct AccessGate {
    api: Arc<dyn StreamApi>,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}

impl AccessGate {
    /// Creates a gate that asks `api` for stream metadata.
    pub fn new(api: Arc<dyn StreamApi>) -> Self {
        Self { api }
    }

    /// Anonymous viewers can never match the ban list.
    ///
    /// # Errors
    /// Returns [`SyncError::Api`] when the metadata fetch fails.
    #[instrument(name = "access.evaluate", skip(self))]
    pub async fn evaluate(
        &self,
        subject: SubjectId,
        viewer: Option<ViewerId>,
    ) -> Result<StreamAccess, SyncError> {
        let response = self.api.stream_access(subject).await?;
        let access = StreamAccess {
            chat_disabled: response.chat_disabled,
            viewer_banned: response.is_banned(viewer),
        };
        if let Some(denial) = access.denial() {
            info!(%denial, "stream access denied");
        }
        Ok(access)
    }
}
