use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use client::{FetchOutcome, SkipReason};
use shared::{
    config::ClientConfig,
    models::{MessageId, SubjectId, ViewerId},
};
use tracing::debug;

use super::{open_session, render};

#[derive(Args, Debug)]
pub struct RepliesArgs {
    /// Stream (subject) identifier
    pub subject: SubjectId,

    /// Parent message identifier
    pub message: MessageId,

    /// Maximum number of reply pages to fetch
    #[arg(long, default_value_t = 5)]
    pub max_pages: u32,

    /// Viewer identity checked against the ban list (overrides configuration)
    #[arg(long)]
    pub viewer: Option<ViewerId>,
}

pub async fn run(config: &ClientConfig, args: &RepliesArgs) -> Result<()> {
    let session = open_session(config, args.subject, args.viewer).await?;

    session
        .open_replies(args.message)
        .await
        .with_context(|| format!("failed to load replies for {}", args.message))?;

    for page in 1..args.max_pages {
        let outcome = session
            .load_more_replies(args.message, None)
            .await
            .context("failed to load more replies")?;
        if let FetchOutcome::Skipped(reason) = outcome {
            debug!(page, ?reason, "stopped paging replies");
            if reason == SkipReason::Exhausted {
                break;
            }
        }
    }

    if let Some(bucket) = session.replies().snapshot(args.message).await {
        println!("{}", render::bucket(&bucket, Utc::now()));
    }
    session.dispose().await;
    Ok(())
}
