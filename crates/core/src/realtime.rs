//! Outbound notification hub.
//!
//! Clients subscribe to a project and receive every status and progress
//! [`Notification`] the project's controller emits, starting with a
//! `SubscriptionConfirmed` message. A socket transport relays these; the
//! hub itself only fans out in-process.

use async_stream::stream;
use sl_protocol::event_models::unix_timestamp;
use sl_protocol::ipc::Notification;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::Stream;
use tracing::{debug, warn};

/// Default per-project channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Sink for controller notifications.
pub trait StatusBroadcaster: Send + Sync {
    /// Deliver `notification` to whoever listens on its project.
    ///
    /// Must not block and must not fail; undeliverable notifications are
    /// dropped.
    fn broadcast(&self, notification: Notification);
}

/// Per-project fan-out over `tokio::sync::broadcast` channels.
pub struct Hub {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<Notification>>>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to `project`. The first message received is the
    /// confirmation.
    pub fn subscribe(&self, project: &str) -> Subscription {
        let rx = self
            .channels()
            .entry(project.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        debug!(project, "Notification subscriber added");

        Subscription {
            project: project.to_string(),
            confirmation: Some(Notification::SubscriptionConfirmed {
                project: project.to_string(),
                timestamp: unix_timestamp(),
            }),
            rx,
        }
    }

    /// Number of live subscriptions for `project`.
    pub fn subscriber_count(&self, project: &str) -> usize {
        self.channels()
            .get(project)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drop the project's channel. Its subscriptions end after draining.
    pub fn remove_project(&self, project: &str) {
        self.channels().remove(project);
    }

    pub fn clear(&self) {
        self.channels().clear();
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<Notification>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatusBroadcaster for Hub {
    fn broadcast(&self, notification: Notification) {
        let channels = self.channels();
        let Some(tx) = channels.get(notification.project()) else {
            return;
        };
        // Fails only when every subscriber is gone.
        if tx.send(notification).is_err() {
            debug!("No live subscribers, notification dropped");
        }
    }
}

/// One client's view of a project's notifications.
pub struct Subscription {
    project: String,
    confirmation: Option<Notification>,
    rx: broadcast::Receiver<Notification>,
}

impl Subscription {
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Next notification, or `None` once the project's channel is gone.
    ///
    /// A subscriber that falls behind skips the notifications it missed.
    pub async fn recv(&mut self) -> Option<Notification> {
        if let Some(confirmation) = self.confirmation.take() {
            return Some(confirmation);
        }
        loop {
            match self.rx.recv().await {
                Ok(notification) => return Some(notification),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(project = %self.project, skipped, "Subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Notification> {
        if let Some(confirmation) = self.confirmation.take() {
            return Some(confirmation);
        }
        loop {
            match self.rx.try_recv() {
                Ok(notification) => return Some(notification),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(project = %self.project, skipped, "Subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(mut self) -> impl Stream<Item = Notification> + Send {
        stream! {
            while let Some(notification) = self.recv().await {
                yield notification;
            }
        }
    }
}
