use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use client::{FetchOutcome, SkipReason};
use shared::{
    config::ClientConfig,
    models::{SubjectId, ViewerId},
};
use tracing::debug;

use super::{open_session, render};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Stream (subject) identifier
    pub subject: SubjectId,

    /// Number of older pages to load after the newest one
    #[arg(long, default_value_t = 0)]
    pub pages: u32,

    /// Viewer identity checked against the ban list (overrides configuration)
    #[arg(long)]
    pub viewer: Option<ViewerId>,
}

pub async fn run(config: &ClientConfig, args: &HistoryArgs) -> Result<()> {
    let session = open_session(config, args.subject, args.viewer).await?;

    for page in 0..args.pages {
        let outcome = session
            .messages()
            .load_older()
            .await
            .context("failed to load older messages")?;
        if let FetchOutcome::Skipped(reason) = outcome {
            debug!(page, ?reason, "stopped paging");
            if reason == SkipReason::Exhausted {
                break;
            }
        }
    }

    let snapshot = session.messages().snapshot().await;
    println!("{}", render::page(&snapshot, Utc::now()));
    session.dispose().await;
    Ok(())
}
