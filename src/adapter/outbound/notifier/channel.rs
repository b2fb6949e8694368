//! Notifier that fans events out to in-process subscribers.

use tokio::sync::broadcast;

use crate::port::{Event, Notifier};

const DEFAULT_CAPACITY: usize = 256;

/// Broadcasts events on a tokio channel.
///
/// Subscribers that fall behind by more than the capacity miss events
/// rather than blocking the orchestrator.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: broadcast::Sender<Event>,
}

impl ChannelNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// A receiver for events notified from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}
