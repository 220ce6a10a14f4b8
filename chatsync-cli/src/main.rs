#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]

//! Main entry point for the `ChatSync` CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use shared::config::ClientConfig;

mod commands;
mod tracer;

use commands::{
    history::HistoryArgs, like::LikeArgs, post::PostArgs, replies::RepliesArgs, watch::WatchArgs,
};

/// `ChatSync` CLI
#[derive(Parser)]
#[command(name = "chatsync")]
#[command(about = "Command-line host for the ChatSync stream synchronizer", long_about = None)]
pub struct Cli {
    /// Path to the configuration file (yaml, json or toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Stream API base URL, overriding the configuration
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the `ChatSync` CLI
#[derive(Subcommand)]
enum Commands {
    /// Follow a stream and print new messages as they arrive
    Watch(WatchArgs),

    /// Print the newest messages of a stream, paging back through history
    History(HistoryArgs),

    /// Print the replies under a message
    Replies(RepliesArgs),

    /// Toggle the viewer's like on a message
    Like(LikeArgs),

    /// Post a message, or a reply with --parent
    Post(PostArgs),

    /// Generate the OpenAPI components for the stream API wire models
    Spec {
        /// Output path (YAML or JSON by extension), or "json"/"yaml" to stream to stdout
        output_path: Option<String>,
    },

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell type for which to generate the completion script (e.g., bash, zsh, fish, powershell)
        #[arg(long, short)]
        shell: clap_complete::Shell,
    },

    /// Generate a configuration file with default values
    Config {
        /// Format of the configuration file to generate (yaml, json or toml). Defaults to yaml.
        #[arg(long, short, default_value = "yaml")]
        format: String,

        /// Where to write the file. Defaults to `chatsync.<format>` in the current directory.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    ClientConfig::load_config(cli.config.as_deref(), cli.api.as_deref())
        .context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Spec { output_path } => commands::spec::generate_spec(output_path.as_deref()),
        Commands::Completion { shell } => {
            commands::completion::generate_completion(*shell);
            Ok(())
        }
        Commands::Config { format, output } => {
            commands::config::generate_config(format, output.as_deref())
        }
        command => {
            let config = resolve_config(&cli)?;
            tracer::initialize_tracing(&config.log_level);
            match command {
                Commands::Watch(args) => commands::watch::run(&config, args).await,
                Commands::History(args) => commands::history::run(&config, args).await,
                Commands::Replies(args) => commands::replies::run(&config, args).await,
                Commands::Like(args) => commands::like::run(&config, args).await,
                Commands::Post(args) => commands::post::run(&config, args).await,
                Commands::Spec { .. } | Commands::Completion { .. } | Commands::Config { .. } => {
                    Ok(())
                }
            }
        }
    }
}
