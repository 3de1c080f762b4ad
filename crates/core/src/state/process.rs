//! Controller state machine.
//!
//! This module holds the mutable state behind a `PipelineController` and
//! the transition functions applied to it. Every function expects the
//! caller to hold the controller lock; none of them publish anything.
//!
//! ```text
//! idle -> running <-> paused
//!           |           |
//!           v           v
//!   completed | stopped | error   (each accepts a new run)
//! ```

use crate::state::signal::{self, RunSignal};
use serde_json::Value;
use sl_protocol::feedback_models::FeedbackStats;
use sl_protocol::process_models::{
    PipelineFailure, PipelineProgress, PipelineStatus, StatusSnapshot,
};
use tokio::sync::watch;

/// How a run's job ended.
#[derive(Debug)]
pub enum Outcome {
    Completed(Value),
    Cancelled,
    Failed(PipelineFailure),
}

/// What happened to a progress report.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    Recorded(PipelineProgress),
    /// The run is paused; the report should be retried once it resumes.
    Paused,
    /// The run is stale, stopped or finished.
    Ignored,
}

/// Mutable state of one project's controller.
#[derive(Debug, Default)]
pub struct RunState {
    pub status: PipelineStatus,
    pub current_task: Option<String>,
    pub progress: PipelineProgress,
    pub failure: Option<PipelineFailure>,
    pub last_result: Option<Value>,
    /// Increases with every run; lets a finished job tell whether it is
    /// still the controller's current run.
    pub run_id: u64,
    /// No background job is executing for the current run.
    pub settled: bool,
    signal: Option<watch::Sender<RunSignal>>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            settled: true,
            ..Self::default()
        }
    }

    pub fn is_current(&self, run_id: u64) -> bool {
        self.run_id == run_id
    }

    pub fn snapshot(&self, project_name: &str, feedback_stats: FeedbackStats) -> StatusSnapshot {
        StatusSnapshot {
            project_name: project_name.to_string(),
            status: self.status,
            current_task: self.current_task.clone(),
            progress: self.progress.clone(),
            feedback_stats,
            failure: self.failure.clone(),
            is_running: self.status == PipelineStatus::Running,
            is_paused: self.status == PipelineStatus::Paused,
            is_stopped: self.status.is_terminal(),
        }
    }

    fn send(&self, value: RunSignal) {
        if let Some(tx) = &self.signal {
            tx.send_replace(value);
        }
    }
}

/// Reset the state for a new run and move to `Running`.
///
/// The caller must have checked that no run is active.
///
/// # Returns
///
/// The new run id and the receiver the job will park on.
pub fn begin_run(
    state: &mut RunState,
    task_name: &str,
    total_steps: usize,
) -> (u64, watch::Receiver<RunSignal>) {
    let (tx, rx) = signal::channel();

    state.run_id += 1;
    state.status = PipelineStatus::Running;
    state.current_task = Some(task_name.to_string());
    state.progress = PipelineProgress::new(total_steps);
    state.failure = None;
    state.last_result = None;
    state.settled = false;
    // Replacing the sender closes the previous run's channel, which a
    // lingering job observes as a stop.
    state.signal = Some(tx);

    (state.run_id, rx)
}

/// `Running -> Paused`.
pub fn pause_run(state: &mut RunState) -> bool {
    if state.status != PipelineStatus::Running {
        return false;
    }
    state.status = PipelineStatus::Paused;
    state.send(RunSignal::Pause);
    true
}

/// `Paused -> Running`.
pub fn resume_run(state: &mut RunState) -> bool {
    if state.status != PipelineStatus::Paused {
        return false;
    }
    state.status = PipelineStatus::Running;
    state.send(RunSignal::Run);
    true
}

/// `Running | Paused -> Stopped`, waking a paused job.
pub fn stop_run(state: &mut RunState) -> bool {
    if !state.status.is_active() {
        return false;
    }
    state.status = PipelineStatus::Stopped;
    state.send(RunSignal::Stop);
    true
}

/// Record a step for `run_id` if it is the current, running run.
pub fn record_progress(
    state: &mut RunState,
    run_id: u64,
    step_number: usize,
    current_step: &str,
    step_description: &str,
) -> ProgressUpdate {
    if !state.is_current(run_id) {
        return ProgressUpdate::Ignored;
    }
    match state.status {
        PipelineStatus::Running => {
            state
                .progress
                .record(step_number, current_step, step_description);
            ProgressUpdate::Recorded(state.progress.clone())
        }
        PipelineStatus::Paused => ProgressUpdate::Paused,
        _ => ProgressUpdate::Ignored,
    }
}

/// Apply the end of `run_id`'s job.
///
/// # Returns
///
/// `false` when the run was superseded and nothing changed.
pub fn finish_run(state: &mut RunState, run_id: u64, outcome: Outcome) -> bool {
    if !state.is_current(run_id) {
        return false;
    }

    match outcome {
        Outcome::Completed(value) => {
            if state.status != PipelineStatus::Stopped {
                state.status = PipelineStatus::Completed;
                state.progress.percent_complete = 100.0;
                state.current_task = None;
            }
            state.last_result = Some(value);
        }
        Outcome::Cancelled => {
            state.status = PipelineStatus::Stopped;
        }
        Outcome::Failed(failure) => {
            state.status = PipelineStatus::Error;
            state.current_task = Some(format!("Error: {failure}"));
            state.failure = Some(failure);
        }
    }

    state.signal = None;
    true
}

/// Mark `run_id`'s job as returned. Called after its final status has been
/// published.
pub fn settle_run(state: &mut RunState, run_id: u64) {
    if state.is_current(run_id) {
        state.settled = true;
    }
}
