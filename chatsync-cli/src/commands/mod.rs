pub mod completion;
pub mod config;
pub mod history;
pub mod like;
pub mod post;
pub mod render;
pub mod replies;
pub mod spec;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use client::{HttpStreamApi, StreamApi, StreamSession, SyncSettings};
use shared::{
    config::ClientConfig,
    models::{SubjectId, ViewerId},
};

/// Builds the HTTP collaborator from the resolved configuration.
pub fn connect(config: &ClientConfig) -> Result<Arc<dyn StreamApi>> {
    let api = HttpStreamApi::from_config(config).context("invalid stream API base URL")?;
    Ok(Arc::new(api))
}

/// Gates and starts a session for `subject`, failing when the newest page
/// could not be loaded.
pub async fn open_session(
    config: &ClientConfig,
    subject: SubjectId,
    viewer: Option<ViewerId>,
) -> Result<StreamSession> {
    let session = StreamSession::start(
        connect(config)?,
        SyncSettings::from(config),
        subject,
        viewer.or(config.viewer_id),
    )
    .await
    .with_context(|| format!("failed to open stream {subject}"))?;

    let snapshot = session.messages().snapshot().await;
    if let Some(error) = snapshot.error.filter(|_| !snapshot.initialized) {
        session.dispose().await;
        anyhow::bail!("failed to load messages for {subject}: {error}");
    }
    Ok(session)
}
