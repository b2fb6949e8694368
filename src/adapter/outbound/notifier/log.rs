//! Notifier that writes events to the tracing log.

use tracing::{info, warn};

use super::format::describe;
use crate::port::{Event, Notifier};

/// Logs every event; failures at `warn`, everything else at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        let cluster = event.cluster_name().unwrap_or("-");
        if event.is_failure() {
            warn!(cluster, "{}", describe(&event));
        } else {
            info!(cluster, "{}", describe(&event));
        }
    }
}
