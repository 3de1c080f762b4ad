//! Assertion and polling helpers.

use sl_core::state::PipelineController;
use sl_protocol::event_models::Event;
use sl_protocol::ipc::Notification;
use sl_protocol::process_models::PipelineStatus;
use std::time::{Duration, Instant};

/// Poll `condition` every 10ms until it holds or `timeout` elapses.
#[allow(dead_code)]
pub fn poll_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Wait for the run to settle and assert its final status.
#[allow(dead_code)]
pub fn assert_finishes_with(controller: &PipelineController, expected: PipelineStatus) {
    let status = controller.wait_until_finished(Duration::from_secs(5));
    assert_eq!(status, Some(expected), "Run did not finish as {expected}");
}

/// Statuses carried by `pipeline_status` events, oldest first.
#[allow(dead_code)]
pub fn status_history(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .rev()
        .filter(|e| e.event_type == "pipeline_status")
        .filter_map(|e| e.payload.get("status").and_then(|s| s.as_str()))
        .map(str::to_string)
        .collect()
}

/// Statuses carried by hub notifications, in arrival order.
#[allow(dead_code)]
pub fn notified_statuses(notifications: &[Notification]) -> Vec<PipelineStatus> {
    notifications
        .iter()
        .filter_map(|n| match n {
            Notification::PipelineStatus { snapshot, .. } => Some(snapshot.status),
            _ => None,
        })
        .collect()
}

/// Assert that `haystack` contains `needle`, ignoring case.
#[allow(dead_code)]
pub fn assert_contains_ci(haystack: &str, needle: &str) {
    assert!(
        haystack.to_lowercase().contains(&needle.to_lowercase()),
        "Expected '{haystack}' to contain '{needle}' (case-insensitive)"
    );
}
