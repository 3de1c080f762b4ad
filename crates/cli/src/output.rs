//! Terminal rendering of configuration and run notifications.

use colored::{ColoredString, Colorize};
use sl_protocol::agent_models::AgentDefinition;
use sl_protocol::event_models::Event;
use sl_protocol::ipc::Notification;
use sl_protocol::pipeline_models::PipelineDefinition;
use sl_protocol::process_models::PipelineStatus;

pub fn pipeline_line(pipeline: &PipelineDefinition) -> String {
    let mut line = format!("{} ({} steps)", pipeline.name.bold(), pipeline.total_steps());
    if !pipeline.description.is_empty() {
        line.push_str(&format!(": {}", pipeline.description));
    }
    line.push_str(&format!("\n  {}", pipeline.steps.join(" -> ").dimmed()));
    line
}

pub fn agent_line(agent: &AgentDefinition) -> String {
    let role = if agent.role.is_empty() {
        String::new()
    } else {
        format!(" [{}]", agent.role)
    };
    format!(
        "{}{role} {} ({})",
        agent.name.bold(),
        agent.description,
        agent.model.dimmed()
    )
}

fn status_label(status: PipelineStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        PipelineStatus::Running => label.blue(),
        PipelineStatus::Paused => label.yellow(),
        PipelineStatus::Completed => label.green().bold(),
        PipelineStatus::Stopped => label.yellow().bold(),
        PipelineStatus::Error => label.red().bold(),
        PipelineStatus::Idle => label.normal(),
    }
}

pub fn notification_line(notification: &Notification) -> String {
    match notification {
        Notification::SubscriptionConfirmed { project, .. } => {
            format!("{} {project}", "Watching".dimmed())
        }
        Notification::PipelineStatus { snapshot, .. } => {
            let mut line = format!("status: {}", status_label(snapshot.status));
            if let Some(failure) = &snapshot.failure {
                line.push_str(&format!(" ({failure})"));
            }
            line
        }
        Notification::PipelineProgress { progress, .. } => format!(
            "[{}/{}] {:>3.0}% {} {}",
            progress.step_number,
            progress.total_steps,
            progress.percent_complete,
            progress.current_step.bold(),
            progress.step_description.dimmed()
        ),
    }
}

/// One line for an `agent_output` event, `None` for any other event.
pub fn agent_output_line(event: &Event) -> Option<String> {
    if event.event_type != "agent_output" {
        return None;
    }
    let output = event.payload.get("output")?.as_str()?;
    Some(format!("  {} {output}", format!("{}:", event.sender).cyan()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use sl_protocol::process_models::PipelineProgress;

    #[test]
    fn test_progress_line() {
        let mut progress = PipelineProgress::new(4);
        progress.record(2, "scene_generator", "Running scene_generator");
        let line = notification_line(&Notification::PipelineProgress {
            project: "noir".to_string(),
            progress,
            timestamp: 0.0,
        });
        assert!(line.starts_with("[2/4]  50%"));
        assert!(line.contains("scene_generator"));
    }

    #[test]
    fn test_agent_output_line_ignores_other_events() {
        let mut payload = Map::new();
        payload.insert("output".to_string(), json!("[editor] done"));
        let output = Event::new("noir", "editor", "ALL", "agent_output", payload.clone());
        let status = Event::new("noir", "pipeline_controller", "ALL", "pipeline_status", payload);

        assert!(agent_output_line(&output).unwrap().contains("[editor] done"));
        assert!(agent_output_line(&status).is_none());
    }

    #[test]
    fn test_pipeline_line_lists_steps() {
        let pipeline = PipelineDefinition::new(
            "chapter",
            vec!["plot_architect".to_string(), "editor".to_string()],
        );
        let line = pipeline_line(&pipeline);
        assert!(line.contains("(2 steps)"));
        assert!(line.contains("plot_architect -> editor"));
    }
}
