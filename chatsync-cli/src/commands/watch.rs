use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use client::{SyncEvent, SyncSettings, Synchronizer};
use shared::{
    config::ClientConfig,
    models::{SubjectId, ViewerId},
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::{connect, render};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Stream (subject) identifier
    pub subject: SubjectId,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Viewer identity checked against the ban list (overrides configuration)
    #[arg(long)]
    pub viewer: Option<ViewerId>,
}

async fn stop_signal(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    }
}

pub async fn run(config: &ClientConfig, args: &WatchArgs) -> Result<()> {
    let mut sync = Synchronizer::new(
        connect(config)?,
        SyncSettings::from(config),
        args.viewer.or(config.viewer_id),
    );

    let mut events = {
        let session = sync
            .switch_subject(args.subject)
            .await
            .with_context(|| format!("failed to open stream {}", args.subject))?;
        let snapshot = session.messages().snapshot().await;
        if let Some(error) = &snapshot.error {
            warn!(%error, "initial load failed; retrying on the next poll");
        }
        println!("{}", render::page(&snapshot, Utc::now()));
        session.subscribe()
    };
    info!(subject = %args.subject, "watching for new messages");

    let stop = stop_signal(args.duration_secs.map(Duration::from_secs));
    tokio::pin!(stop);
    loop {
        tokio::select! {
            () = &mut stop => break,
            event = events.recv() => match event {
                Ok(SyncEvent::NewestRefreshed { inserted }) => {
                    let now = Utc::now();
                    for message in &inserted {
                        println!("{}", render::message_line(message, now));
                    }
                }
                Ok(SyncEvent::FetchFailed { message, .. }) => {
                    warn!(error = %message, "poll failed; keeping current messages");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event feed lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    sync.close().await;
    Ok(())
}
