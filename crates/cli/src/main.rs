//! screenplay: drive a screenplay generation backend from the terminal.
//!
//! Usage:
//!     screenplay projects
//!     screenplay --project <ID> analyze
//!     screenplay --project <ID> write --stream

mod commands;
mod render;

use clap::{Parser, Subcommand};
use sk_core::config::loader::{load_config, load_config_with_override};
use sk_protocol::ExportFormat;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "screenplay", about = "Drive the screenplay generation pipeline", version)]
pub struct Cli {
    /// Directory containing `.screenplay-kit/config.toml`
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Backend URL (overrides config and SCREENPLAY_API_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Project to operate on
    #[arg(short, long, global = true, env = "SCREENPLAY_PROJECT")]
    project: Option<String>,

    /// Log info/debug to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the backend is up
    Health,

    /// List projects
    Projects,

    /// Create a project
    Create {
        name: String,

        /// Target runtime in minutes
        #[arg(long)]
        duration: Option<u32>,

        #[arg(long)]
        methodology: Option<String>,

        #[arg(long)]
        language: Option<String>,
    },

    /// Delete a project
    Delete { project_id: String },

    /// Show the current state of a project
    Show,

    /// List methodologies, or show one in detail
    Methodologies { id: Option<String> },

    /// Upload the source material (PDF, TXT, DOCX, MD)
    Upload { path: PathBuf },

    /// Analyze the source and propose film concepts
    Analyze,

    /// Pick a concept by its 1-based number
    SelectConcept { number: usize },

    /// Generate the beat sheet
    BeatSheet {
        /// Defaults to the configured methodology
        #[arg(long)]
        methodology: Option<String>,
    },

    /// Generate scene outlines
    Outline,

    /// Write the next scene
    Write {
        /// Print the scene as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// Approve a written scene
    Approve { scene: u32 },

    /// Lengthen a written scene
    Expand { scene: u32 },

    /// Rewrite a scene following notes
    Revise { scene: u32, notes: String },

    /// Review the whole screenplay
    Optimize,

    /// Export the screenplay
    Export {
        #[arg(long, default_value = "markdown")]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show context-window usage
    Context,

    /// Show the backend's progress report
    Status,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "sk_core=debug,info" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match cli.url.as_deref() {
        Some(url) => load_config_with_override(&cli.root, Some(url))?,
        None => load_config(&cli.root)?,
    };
    tracing::debug!(base_url = %config.base_url, "starting");

    commands::run(cli.command, cli.project, config)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("{e:#}"))
}
