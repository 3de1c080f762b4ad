//! Subcommand implementations.

use crate::output;
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use colored::Colorize;
use sl_core::config::load_config;
use sl_core::init::{generate_storyloom_structure, InitOptions};
use sl_core::registry::Registry;
use sl_core::service::CommandService;
use sl_protocol::feedback_models::{FeedbackPriority, FeedbackType};
use sl_protocol::ipc::{Notification, Op, Reply};
use sl_protocol::process_models::PipelineStatus;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub async fn init(path: PathBuf, force: bool, minimal: bool) -> Result<()> {
    let options = InitOptions {
        target_dir: path.clone(),
        force,
        minimal,
    };
    let written = generate_storyloom_structure(options).await?;

    println!("{} {}", "Initialized".green().bold(), path.join(".storyloom").display());
    for file in written {
        println!("  {file}");
    }
    Ok(())
}

pub async fn pipelines(path: &Path) -> Result<()> {
    let config = load_config(path).await?;
    if config.pipelines.is_empty() {
        println!("No pipelines found. Run `storyloom init` first.");
        return Ok(());
    }
    for pipeline in &config.pipelines {
        println!("{}", output::pipeline_line(pipeline));
    }
    Ok(())
}

pub async fn agents(path: &Path) -> Result<()> {
    let config = load_config(path).await?;
    if config.agents.is_empty() {
        println!("No agents found. Run `storyloom init` first.");
        return Ok(());
    }
    for agent in &config.agents {
        println!("{}", output::agent_line(agent));
    }
    Ok(())
}

pub struct RunArgs {
    pub pipeline: String,
    pub path: PathBuf,
    pub project: String,
    pub idea: String,
    pub feedback: Vec<String>,
    pub step_delay_ms: u64,
}

/// Start a pipeline, stream its notifications and exit by its final status.
pub async fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args.path)
        .await
        .wrap_err_with(|| format!("Failed to load {}", args.path.display()))?;
    let timeout = Duration::from_secs(config.settings.pipeline.timeout_secs);

    if !Registry::init_global(config.settings.clone()) {
        debug!("Global registry already initialized");
    }
    let registry = Registry::global();
    let service = CommandService::new(registry, config)
        .with_step_delay(Duration::from_millis(args.step_delay_ms));

    let mut subscription = registry.hub().subscribe(&args.project);
    registry.get_event_bus(&args.project).observe(|event| {
        if let Some(line) = output::agent_output_line(event) {
            println!("{line}");
        }
        Ok(())
    });

    for entry in &args.feedback {
        let (target_agent, content) = parse_feedback(entry)?;
        let op = Op::InjectFeedback {
            project: args.project.clone(),
            target_agent: target_agent.to_string(),
            content: content.to_string(),
            feedback_type: FeedbackType::Guidance,
            priority: FeedbackPriority::Normal,
            source: "cli".to_string(),
        };
        match service.handle(op) {
            Reply::FeedbackQueued { id } => {
                println!("{} for {target_agent} ({id})", "Feedback queued".cyan());
            }
            Reply::Rejected { reason } => bail!("Feedback rejected: {reason}"),
            other => bail!("Unexpected reply: {other:?}"),
        }
    }

    let start = Op::StartPipeline {
        project: args.project.clone(),
        pipeline: args.pipeline.clone(),
        idea: args.idea,
    };
    match service.handle(start) {
        Reply::Ack { accepted: true } => {}
        Reply::Ack { accepted: false } => bail!("A pipeline is already running for '{}'", args.project),
        Reply::Rejected { reason } => bail!(reason),
        other => bail!("Unexpected reply: {other:?}"),
    }

    let mut final_status = None;
    loop {
        tokio::select! {
            notification = subscription.recv() => {
                let Some(notification) = notification else { break };
                println!("{}", output::notification_line(&notification));
                if let Notification::PipelineStatus { snapshot, .. } = &notification {
                    if snapshot.status.is_terminal() {
                        final_status = Some(snapshot.status);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Stopping...".yellow());
                service.handle(Op::StopPipeline { project: args.project.clone() });
            }
        }
    }

    let controller = registry.get_pipeline_controller(&args.project);
    let settled = tokio::task::spawn_blocking(move || controller.wait_until_finished(timeout)).await?;
    if settled.is_none() {
        bail!("Pipeline did not finish within {}s", timeout.as_secs());
    }

    match final_status {
        Some(PipelineStatus::Completed) => Ok(()),
        Some(status) => Err(eyre!("Pipeline finished with status {status}")),
        None => Err(eyre!("Notification stream closed before the pipeline finished")),
    }
}

/// Split `AGENT=TEXT`.
fn parse_feedback(entry: &str) -> Result<(&str, &str)> {
    match entry.split_once('=') {
        Some((agent, text)) if !agent.trim().is_empty() && !text.trim().is_empty() => {
            Ok((agent.trim(), text.trim()))
        }
        _ => bail!("Invalid feedback '{entry}', expected AGENT=TEXT"),
    }
}
