//! Handle given to a running job.

use crate::event_bus::EventBus;
use crate::feedback::FeedbackManager;
use crate::state::controller::PipelineController;
use crate::state::error::PipelineError;
use crate::state::process::ProgressUpdate;
use crate::state::signal::{self, RunSignal};
use std::sync::Arc;
use tokio::sync::watch;

/// Result of a cooperative cancellation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Nothing was requested; carry on.
    Continue,
    /// The run was paused and has since been resumed.
    Resumed,
    /// Stop was requested; the job should return `PipelineError::Cancelled`.
    Cancelled,
}

/// The controller's checkpoint API, scoped to one run.
///
/// Calls made through a context whose run has been superseded by a newer
/// `start_pipeline` observe a stop and never touch the newer run.
#[derive(Clone)]
pub struct PipelineContext {
    controller: Arc<PipelineController>,
    run_id: u64,
    signal: watch::Receiver<RunSignal>,
}

impl PipelineContext {
    pub(crate) fn new(
        controller: Arc<PipelineController>,
        run_id: u64,
        signal: watch::Receiver<RunSignal>,
    ) -> Self {
        Self {
            controller,
            run_id,
            signal,
        }
    }

    pub fn project_name(&self) -> &str {
        self.controller.project_name()
    }

    pub fn feedback(&self) -> &Arc<FeedbackManager> {
        self.controller.feedback_manager()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        self.controller.event_bus()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.signal.has_changed().is_err() || signal::current(&self.signal) == RunSignal::Stop
    }

    /// Stop check, then a wait while paused, then a second stop check.
    pub async fn checkpoint(&self) -> Checkpoint {
        if self.is_stop_requested() {
            return Checkpoint::Cancelled;
        }
        if signal::current(&self.signal) != RunSignal::Pause {
            return Checkpoint::Continue;
        }

        let mut rx = self.signal.clone();
        match signal::wait_while_paused(&mut rx).await {
            RunSignal::Stop => Checkpoint::Cancelled,
            _ if self.is_stop_requested() => Checkpoint::Cancelled,
            _ => Checkpoint::Resumed,
        }
    }

    /// Park while paused.
    ///
    /// # Returns
    ///
    /// `false` when the run was stopped, `true` otherwise.
    pub async fn wait_for_resume(&self) -> bool {
        self.checkpoint().await != Checkpoint::Cancelled
    }

    /// Report the step being worked on.
    ///
    /// Waits out a pause first, so the step is recorded once the run is
    /// running again. A pause that lands between that wait and the record
    /// sends the report back through the checkpoint. Progress reported
    /// for a stale or finished run is ignored.
    ///
    /// # Errors
    ///
    /// `PipelineError::Cancelled` once stop has been requested.
    pub async fn update_progress(
        &self,
        step_number: usize,
        current_step: &str,
        step_description: &str,
    ) -> Result<(), PipelineError> {
        loop {
            if self.checkpoint().await == Checkpoint::Cancelled {
                return Err(PipelineError::Cancelled);
            }
            let update = self.controller.record_progress(
                self.run_id,
                step_number,
                current_step,
                step_description,
            );
            if update != ProgressUpdate::Paused {
                return Ok(());
            }
        }
    }
}
