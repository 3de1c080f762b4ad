//! `storyloom` command-line entry point.
//!
//! ```text
//! storyloom init [--path DIR] [--force] [--minimal]
//! storyloom pipelines [--path DIR]
//! storyloom agents [--path DIR]
//! storyloom run <PIPELINE> [--project NAME] [--idea TEXT]
//!               [--feedback AGENT=TEXT]... [--step-delay-ms N]
//! ```

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "storyloom")]
#[command(author, version, about = "Multi-agent story pipelines with live feedback")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a .storyloom directory with starter agents and pipelines
    Init {
        /// Project directory
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing .storyloom directory
        #[arg(long)]
        force: bool,

        /// Only the chapter pipeline and its agents
        #[arg(long)]
        minimal: bool,
    },

    /// List configured pipelines
    Pipelines {
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },

    /// List configured agents
    Agents {
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },

    /// Run a pipeline locally with mock agents
    Run {
        /// Pipeline name
        pipeline: String,

        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Project the run is registered under
        #[arg(long, default_value = "default")]
        project: String,

        /// Story premise handed to the first step
        #[arg(long, default_value = "An untitled story")]
        idea: String,

        /// Feedback queued before the run starts, as AGENT=TEXT (repeatable)
        #[arg(long = "feedback", value_name = "AGENT=TEXT")]
        feedback: Vec<String>,

        /// Pause after each step, in milliseconds
        #[arg(long, default_value_t = 0)]
        step_delay_ms: u64,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init {
            path,
            force,
            minimal,
        } => commands::init(path, force, minimal).await,
        Commands::Pipelines { path } => commands::pipelines(&path).await,
        Commands::Agents { path } => commands::agents(&path).await,
        Commands::Run {
            pipeline,
            path,
            project,
            idea,
            feedback,
            step_delay_ms,
        } => {
            commands::run(commands::RunArgs {
                pipeline,
                path,
                project,
                idea,
                feedback,
                step_delay_ms,
            })
            .await
        }
    }
}
