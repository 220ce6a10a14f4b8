use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use shared::{
    config::ClientConfig,
    models::{MessageId, SubjectId, ViewerId},
};

use super::{open_session, render};

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Stream (subject) identifier
    pub subject: SubjectId,

    /// Message text
    pub content: String,

    /// Reply to this message instead of posting at the top level
    #[arg(long)]
    pub parent: Option<MessageId>,

    /// Viewer identity checked against the ban list (overrides configuration)
    #[arg(long)]
    pub viewer: Option<ViewerId>,
}

pub async fn run(config: &ClientConfig, args: &PostArgs) -> Result<()> {
    let session = open_session(config, args.subject, args.viewer).await?;
    let result = session.post_message(&args.content, args.parent).await;
    session.dispose().await;

    let created = result.context("failed to post message")?;
    println!("{}", render::message_line(&created, Utc::now()));
    Ok(())
}
