//! Notifier that records every event.

use std::sync::{Arc, Mutex};

use crate::port::{Event, Notifier};

/// Collects events for later assertions. Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Events matching `predicate`.
    pub fn matching(&self, predicate: impl Fn(&Event) -> bool) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    pub fn failures(&self) -> Vec<Event> {
        self.matching(Event::is_failure)
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}
