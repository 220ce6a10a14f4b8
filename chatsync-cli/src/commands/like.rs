use anyhow::{Context, Result, bail};
use clap::Args;
use client::{StreamSession, SyncError};
use shared::{
    config::ClientConfig,
    models::{LikeState, MessageId, SubjectId, ViewerId},
};

use super::{open_session, render};

#[derive(Args, Debug)]
pub struct LikeArgs {
    /// Stream (subject) identifier
    pub subject: SubjectId,

    /// Message to like or unlike
    pub message: MessageId,

    /// Viewer identity checked against the ban list (overrides configuration)
    #[arg(long)]
    pub viewer: Option<ViewerId>,
}

/// Toggles the like, paging back through history until the message is
/// loaded.
async fn toggle(session: &StreamSession, message: MessageId) -> Result<LikeState> {
    loop {
        match session.toggle_like(message).await {
            Err(SyncError::UnknownMessage(_)) if session.messages().has_more().await => {
                let outcome = session
                    .messages()
                    .load_older()
                    .await
                    .context("failed to page back through history")?;
                if !outcome.is_applied() {
                    bail!("message {message} could not be located in the stream");
                }
            }
            Err(SyncError::UnknownMessage(_)) => {
                bail!("message {message} is not part of this stream")
            }
            result => return result.context("failed to toggle like"),
        }
    }
}

pub async fn run(config: &ClientConfig, args: &LikeArgs) -> Result<()> {
    let session = open_session(config, args.subject, args.viewer).await?;
    let result = toggle(&session, args.message).await;
    session.dispose().await;

    println!("{}", render::like_state(result?));
    Ok(())
}
