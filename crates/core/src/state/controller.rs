//! Per-project pipeline controller.
//!
//! The `PipelineController` runs at most one pipeline job at a time on a
//! dedicated OS thread and lets any other thread pause, resume or stop it,
//! read a consistent status snapshot, and inject feedback while it runs.
//!
//! Status and progress changes go out two ways: as `pipeline_status` /
//! `pipeline_progress` events on the project's [`EventBus`], and as
//! [`Notification`]s to an attached [`StatusBroadcaster`].

use crate::event_bus::{payload, EventBus};
use crate::feedback::{FeedbackManager, FeedbackRequest};
use crate::realtime::StatusBroadcaster;
use crate::state::context::PipelineContext;
use crate::state::error::{ControllerError, PipelineError};
use crate::state::job::PipelineJob;
use crate::state::process::{self, Outcome, ProgressUpdate, RunState};
use serde::Serialize;
use serde_json::{json, Map, Value};
use sl_protocol::event_models::{unix_timestamp, BROADCAST};
use sl_protocol::ipc::Notification;
use sl_protocol::process_models::{
    FailureKind, PipelineFailure, PipelineProgress, PipelineStatus, StatusSnapshot,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Sender name on every event the controller publishes.
pub const CONTROLLER_SENDER: &str = "pipeline_controller";
pub const STATUS_EVENT: &str = "pipeline_status";
pub const PROGRESS_EVENT: &str = "pipeline_progress";
pub const FEEDBACK_EVENT: &str = "user_feedback";

/// State machine for one project's pipeline runs.
///
/// Lock order is controller state, then feedback manager. Nothing is
/// published while the state lock is held, so event subscribers and
/// broadcasters may call back into the controller.
pub struct PipelineController {
    project_name: String,
    event_bus: Arc<EventBus>,
    feedback: Arc<FeedbackManager>,
    broadcaster: Option<Arc<dyn StatusBroadcaster>>,
    state: Mutex<RunState>,
    settled: Condvar,
}

impl PipelineController {
    /// Controller with its own event bus and no broadcaster.
    pub fn new(project_name: impl Into<String>) -> Self {
        let project_name = project_name.into();
        let event_bus = Arc::new(EventBus::new(project_name.clone()));
        Self::with_event_bus(project_name, event_bus)
    }

    /// Controller publishing to an existing project bus.
    pub fn with_event_bus(project_name: impl Into<String>, event_bus: Arc<EventBus>) -> Self {
        let project_name = project_name.into();
        Self {
            feedback: Arc::new(FeedbackManager::new(project_name.clone())),
            project_name,
            event_bus,
            broadcaster: None,
            state: Mutex::new(RunState::new()),
            settled: Condvar::new(),
        }
    }

    /// Attach the outbound notification channel.
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn StatusBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn feedback_manager(&self) -> &Arc<FeedbackManager> {
        &self.feedback
    }

    /// Start `job` on a background thread.
    ///
    /// # Arguments
    ///
    /// * `job` - The pipeline to run
    /// * `task_name` - Shown as the current task while the run is active
    /// * `total_steps` - Denominator for the progress percentage
    ///
    /// # Returns
    ///
    /// `Ok(false)` without any effect when a run is already active,
    /// `Ok(true)` once the new run is `Running`.
    ///
    /// # Errors
    ///
    /// - `ControllerError::InvalidParams` when `job.validate()` fails; the
    ///   state is left untouched.
    /// - `ControllerError::Spawn` when the thread cannot be created; the run
    ///   is recorded as failed.
    pub fn start_pipeline<J: PipelineJob>(
        self: &Arc<Self>,
        job: J,
        task_name: &str,
        total_steps: usize,
    ) -> Result<bool, ControllerError> {
        if self.state().status.is_active() {
            return Ok(false);
        }

        job.validate().map_err(|e| match e {
            PipelineError::InvalidParams(reason) => ControllerError::InvalidParams(reason),
            other => ControllerError::InvalidParams(other.to_string()),
        })?;

        let (run_id, signal) = {
            let mut state = self.state();
            if state.status.is_active() {
                return Ok(false);
            }
            process::begin_run(&mut state, task_name, total_steps)
        };

        info!(project = %self.project_name, task = task_name, total_steps, "Pipeline started");

        let ctx = PipelineContext::new(Arc::clone(self), run_id, signal);
        let controller = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("storyloom-pipeline-{}", self.project_name))
            .spawn(move || controller.drive(run_id, job, ctx));

        if let Err(e) = spawned {
            let failure = PipelineFailure::new(FailureKind::Runtime, "Failed to spawn pipeline thread")
                .with_cause(e.to_string());
            self.finish(run_id, Outcome::Failed(failure));
            return Err(ControllerError::Spawn(e));
        }

        self.publish_status();
        Ok(true)
    }

    /// `Running -> Paused`. The job parks at its next checkpoint.
    pub fn pause(&self) -> bool {
        self.transition("pause", process::pause_run)
    }

    /// `Paused -> Running`.
    pub fn resume(&self) -> bool {
        self.transition("resume", process::resume_run)
    }

    /// `Running | Paused -> Stopped`. A paused job wakes and cancels.
    pub fn stop(&self) -> bool {
        self.transition("stop", process::stop_run)
    }

    /// Consistent snapshot of the controller and its feedback counts.
    pub fn get_status(&self) -> StatusSnapshot {
        let state = self.state();
        state.snapshot(&self.project_name, self.feedback.get_stats())
    }

    pub fn status(&self) -> PipelineStatus {
        self.state().status
    }

    /// Value returned by the last run that completed.
    pub fn last_result(&self) -> Option<Value> {
        self.state().last_result.clone()
    }

    /// Queue feedback and announce it on the event bus.
    pub fn inject_feedback(&self, request: FeedbackRequest) -> Uuid {
        let recipient = request.target_agent.clone();
        let source = request.source.clone();
        let mut event_payload = payload([
            ("content", json!(request.content)),
            ("feedback_type", json!(request.feedback_type)),
            ("priority", json!(request.priority)),
        ]);

        let id = self.feedback.add_feedback(request);
        event_payload.insert("feedback_id".to_string(), json!(id));
        self.event_bus
            .publish(&source, &recipient, FEEDBACK_EVENT, event_payload);
        id
    }

    /// Block until the current run's job has returned.
    ///
    /// # Returns
    ///
    /// The status at that point, or `None` if `timeout` elapsed first.
    /// Returns immediately when no job is executing. A timeout too large to
    /// form a deadline waits without one.
    pub fn wait_until_finished(&self, timeout: Duration) -> Option<PipelineStatus> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            let state = self
                .settled
                .wait_while(self.state(), |state| !state.settled)
                .unwrap_or_else(PoisonError::into_inner);
            return Some(state.status);
        };

        let mut state = self.state();
        while !state.settled {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (guard, result) = self
                .settled
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            if result.timed_out() && !state.settled {
                return None;
            }
        }
        Some(state.status)
    }

    pub(crate) fn record_progress(
        &self,
        run_id: u64,
        step_number: usize,
        current_step: &str,
        step_description: &str,
    ) -> ProgressUpdate {
        let update = {
            let mut state = self.state();
            process::record_progress(&mut state, run_id, step_number, current_step, step_description)
        };

        match &update {
            ProgressUpdate::Recorded(progress) => {
                debug!(
                    project = %self.project_name,
                    step_number,
                    current_step,
                    "Pipeline progress"
                );
                self.publish_progress(progress.clone());
            }
            ProgressUpdate::Paused => {
                debug!(project = %self.project_name, step_number, "Progress deferred, run is paused");
            }
            ProgressUpdate::Ignored => {
                debug!(
                    project = %self.project_name,
                    step_number,
                    current_step,
                    "Progress ignored, run is not running"
                );
            }
        }
        update
    }

    fn transition(&self, name: &str, apply: fn(&mut RunState) -> bool) -> bool {
        let (applied, status) = {
            let mut state = self.state();
            (apply(&mut state), state.status)
        };

        if applied {
            debug!(project = %self.project_name, transition = name, %status, "Pipeline transition");
            self.publish_status();
        } else {
            debug!(project = %self.project_name, transition = name, %status, "Transition not allowed");
        }
        applied
    }

    /// Thread body: host a current-thread runtime and run the job on it.
    fn drive<J: PipelineJob>(&self, run_id: u64, job: J, ctx: PipelineContext) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build();

        let outcome = match runtime {
            Ok(runtime) => {
                match catch_unwind(AssertUnwindSafe(|| runtime.block_on(job.run(ctx)))) {
                    Ok(Ok(value)) => Outcome::Completed(value),
                    Ok(Err(PipelineError::Cancelled)) => Outcome::Cancelled,
                    Ok(Err(e)) => Outcome::Failed(e.to_failure()),
                    Err(panic) => Outcome::Failed(
                        PipelineFailure::new(FailureKind::Unknown, "Pipeline panicked")
                            .with_cause(panic_message(panic.as_ref())),
                    ),
                }
            }
            Err(e) => Outcome::Failed(
                PipelineFailure::new(FailureKind::Runtime, "Failed to build pipeline runtime")
                    .with_cause(e.to_string()),
            ),
        };

        self.finish(run_id, outcome);
    }

    fn finish(&self, run_id: u64, outcome: Outcome) {
        let (applied, status, failure) = {
            let mut state = self.state();
            let applied = process::finish_run(&mut state, run_id, outcome);
            (applied, state.status, state.failure.clone())
        };

        if applied {
            match (status, failure) {
                (PipelineStatus::Error, Some(failure)) => {
                    warn!(project = %self.project_name, kind = ?failure.kind, "Pipeline failed: {failure}");
                }
                _ => info!(project = %self.project_name, %status, "Pipeline finished"),
            }
            self.publish_status();
        } else {
            debug!(project = %self.project_name, run_id, "Superseded run finished");
        }

        process::settle_run(&mut self.state(), run_id);
        self.settled.notify_all();
    }

    fn publish_status(&self) {
        let snapshot = self.get_status();
        self.publish_event(STATUS_EVENT, &snapshot);
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.broadcast(Notification::PipelineStatus {
                project: self.project_name.clone(),
                snapshot,
                timestamp: unix_timestamp(),
            });
        }
    }

    fn publish_progress(&self, progress: PipelineProgress) {
        self.publish_event(PROGRESS_EVENT, &progress);
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.broadcast(Notification::PipelineProgress {
                project: self.project_name.clone(),
                progress,
                timestamp: unix_timestamp(),
            });
        }
    }

    fn publish_event<T: Serialize>(&self, event_type: &str, body: &T) {
        match serde_json::to_value(body) {
            Ok(Value::Object(map)) => {
                self.event_bus
                    .publish(CONTROLLER_SENDER, BROADCAST, event_type, map);
            }
            Ok(other) => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                self.event_bus
                    .publish(CONTROLLER_SENDER, BROADCAST, event_type, map);
            }
            Err(e) => warn!(project = %self.project_name, event_type, "Failed to encode event: {e}"),
        }
    }

    fn state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::job::pipeline_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_new_controller_is_idle() {
        let controller = PipelineController::new("noir");
        let snapshot = controller.get_status();
        assert_eq!(snapshot.status, PipelineStatus::Idle);
        assert!(snapshot.current_task.is_none());
        assert!(!snapshot.is_running && !snapshot.is_paused && !snapshot.is_stopped);
        assert_eq!(controller.wait_until_finished(WAIT), Some(PipelineStatus::Idle));
    }

    #[test]
    fn test_unbounded_wait() {
        let controller = Arc::new(PipelineController::new("noir"));
        assert_eq!(
            controller.wait_until_finished(Duration::MAX),
            Some(PipelineStatus::Idle)
        );

        controller
            .start_pipeline(
                pipeline_fn(|ctx| async move {
                    ctx.update_progress(1, "editor", "polishing").await?;
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(Value::Null)
                }),
                "polish",
                1,
            )
            .unwrap();
        assert_eq!(
            controller.wait_until_finished(Duration::MAX),
            Some(PipelineStatus::Completed)
        );
    }

    #[test]
    fn test_progress_while_paused_is_deferred_not_dropped() {
        let controller = Arc::new(PipelineController::new("noir"));
        let gate = Arc::new(tokio::sync::Notify::new());
        let job_gate = Arc::clone(&gate);
        controller
            .start_pipeline(
                pipeline_fn(move |_ctx| {
                    let gate = Arc::clone(&job_gate);
                    async move {
                        gate.notified().await;
                        Ok(Value::Null)
                    }
                }),
                "chapter",
                4,
            )
            .unwrap();
        let run_id = controller.state().run_id;

        assert!(controller.pause());
        assert_eq!(
            controller.record_progress(run_id, 2, "scene_generator", "drafting"),
            ProgressUpdate::Paused
        );
        assert_eq!(controller.get_status().progress.step_number, 0);

        assert!(controller.resume());
        assert!(matches!(
            controller.record_progress(run_id, 2, "scene_generator", "drafting"),
            ProgressUpdate::Recorded(_)
        ));
        assert_eq!(controller.get_status().progress.step_number, 2);
        assert_eq!(
            controller.record_progress(run_id - 1, 3, "editor", ""),
            ProgressUpdate::Ignored
        );

        gate.notify_one();
        assert_eq!(
            controller.wait_until_finished(WAIT),
            Some(PipelineStatus::Completed)
        );
    }

    #[test]
    fn test_completed_run_publishes_status_events() {
        let controller = Arc::new(PipelineController::new("noir"));
        let started = controller
            .start_pipeline(
                pipeline_fn(|ctx| async move {
                    ctx.update_progress(1, "plot_architect", "outline").await?;
                    Ok(json!("done"))
                }),
                "outline",
                2,
            )
            .unwrap();
        assert!(started);

        assert_eq!(
            controller.wait_until_finished(WAIT),
            Some(PipelineStatus::Completed)
        );
        assert_eq!(controller.last_result(), Some(json!("done")));

        let events = controller.event_bus().get_recent("anyone", 100);
        assert!(events.iter().all(|e| e.sender == CONTROLLER_SENDER));
        assert_eq!(events[0].event_type, STATUS_EVENT);
        assert_eq!(events[0].payload["status"], "completed");
        assert!(events.iter().any(|e| e.event_type == PROGRESS_EVENT
            && e.payload["percent_complete"] == json!(50.0)));
    }

    #[test]
    fn test_invalid_params_leave_state_untouched() {
        struct NeedsIdea;

        #[async_trait::async_trait]
        impl PipelineJob for NeedsIdea {
            fn validate(&self) -> Result<(), PipelineError> {
                Err(PipelineError::InvalidParams("idea must not be empty".to_string()))
            }

            async fn run(&self, _ctx: PipelineContext) -> Result<Value, PipelineError> {
                Ok(Value::Null)
            }
        }

        let controller = Arc::new(PipelineController::new("noir"));
        let err = controller.start_pipeline(NeedsIdea, "bible", 3).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidParams(_)));
        assert_eq!(controller.status(), PipelineStatus::Idle);
        assert!(controller.event_bus().is_empty());
    }

    #[test]
    fn test_panicking_job_is_recorded() {
        let controller = Arc::new(PipelineController::new("noir"));
        controller
            .start_pipeline(
                pipeline_fn(|_ctx| async move {
                    if true {
                        panic!("scene generator exploded");
                    }
                    Ok(Value::Null)
                }),
                "draft",
                1,
            )
            .unwrap();

        assert_eq!(controller.wait_until_finished(WAIT), Some(PipelineStatus::Error));
        let failure = controller.get_status().failure.unwrap();
        assert_eq!(failure.kind, FailureKind::Unknown);
        assert_eq!(failure.cause.as_deref(), Some("scene generator exploded"));
    }

    #[test]
    fn test_inject_feedback_publishes_event() {
        let controller = PipelineController::new("noir");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        controller.event_bus().subscribe("scene_generator", move |event| {
            assert_eq!(event.event_type, FEEDBACK_EVENT);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let id = controller.inject_feedback(FeedbackRequest::new("scene_generator", "darker"));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let event = &controller.event_bus().get_recent("scene_generator", 1)[0];
        assert_eq!(event.sender, "user");
        assert_eq!(event.payload["feedback_id"], json!(id));
        assert_eq!(event.payload["priority"], "NORMAL");
        assert_eq!(controller.get_status().feedback_stats.unprocessed, 1);
    }

    #[test]
    fn test_subscriber_can_read_status() {
        let controller = Arc::new(PipelineController::new("noir"));
        let inner = Arc::clone(&controller);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        controller.event_bus().subscribe(BROADCAST, move |event| {
            if event.event_type == STATUS_EVENT {
                sink.lock().unwrap().push(inner.get_status().status);
            }
            Ok(())
        });

        controller
            .start_pipeline(pipeline_fn(|_ctx| async { Ok(Value::Null) }), "noop", 0)
            .unwrap();
        controller.wait_until_finished(WAIT);

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert_eq!(seen.last(), Some(&PipelineStatus::Completed));
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "non-string panic payload");
    }
}
