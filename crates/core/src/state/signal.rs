//! Pause/stop signalling between the controller and a running job.
//!
//! Each run gets its own `watch` channel. The controller owns the sender
//! and flips the value; the job holds a receiver and parks on it while
//! paused instead of polling.

use tokio::sync::watch;

/// What the controller currently asks of the running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunSignal {
    #[default]
    Run,
    Pause,
    Stop,
}

/// Create the channel for a fresh run.
pub fn channel() -> (watch::Sender<RunSignal>, watch::Receiver<RunSignal>) {
    watch::channel(RunSignal::Run)
}

/// Current signal without waiting.
pub fn current(rx: &watch::Receiver<RunSignal>) -> RunSignal {
    *rx.borrow()
}

/// Park until the signal is no longer `Pause`.
///
/// Returns the signal that ended the wait: `Run` or `Stop`. A dropped sender
/// counts as `Stop`.
pub async fn wait_while_paused(rx: &mut watch::Receiver<RunSignal>) -> RunSignal {
    match rx.wait_for(|signal| *signal != RunSignal::Pause).await {
        Ok(signal) => *signal,
        Err(_) => RunSignal::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_immediately_when_running() {
        let (_tx, mut rx) = channel();
        assert_eq!(wait_while_paused(&mut rx).await, RunSignal::Run);
    }

    #[tokio::test]
    async fn test_wait_wakes_on_resume() {
        let (tx, mut rx) = channel();
        tx.send_replace(RunSignal::Pause);

        let waiter = tokio::spawn(async move { wait_while_paused(&mut rx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        tx.send_replace(RunSignal::Run);
        assert_eq!(waiter.await.unwrap(), RunSignal::Run);
    }

    #[tokio::test]
    async fn test_wait_wakes_on_stop() {
        let (tx, mut rx) = channel();
        tx.send_replace(RunSignal::Pause);

        let waiter = tokio::spawn(async move { wait_while_paused(&mut rx).await });
        tx.send_replace(RunSignal::Stop);
        assert_eq!(waiter.await.unwrap(), RunSignal::Stop);
    }

    #[tokio::test]
    async fn test_dropped_sender_counts_as_stop() {
        let (tx, mut rx) = channel();
        tx.send_replace(RunSignal::Pause);
        drop(tx);
        assert_eq!(wait_while_paused(&mut rx).await, RunSignal::Stop);
    }
}
