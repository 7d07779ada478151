//! Sync outcomes and the sinks that record them.

use std::sync::Mutex;

/// Observable result of dispatching one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The runtime already had the image; nothing was pulled
    AlreadyPresent { fleet: String, image: String },
    /// The image was pulled and resolved to `image_ref`
    Synced {
        fleet: String,
        image: String,
        image_ref: String,
    },
    /// The fleet was deleted; its image is left in place
    Deleted { fleet: String },
    /// Event type this version does not act on
    Ignored { event_type: String },
}

impl SyncOutcome {
    pub fn fleet(&self) -> Option<&str> {
        match self {
            Self::AlreadyPresent { fleet, .. }
            | Self::Synced { fleet, .. }
            | Self::Deleted { fleet } => Some(fleet),
            Self::Ignored { .. } => None,
        }
    }
}

/// Structured sink for sync outcomes, injected into the syncer.
pub trait OutcomeSink: Send + Sync {
    fn record(&self, outcome: &SyncOutcome);
}

/// Emits each outcome as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutcomeSink for TracingSink {
    fn record(&self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::AlreadyPresent { fleet, image } => {
                tracing::info!(fleet = %fleet, image = %image, "image already present");
            }
            SyncOutcome::Synced {
                fleet,
                image,
                image_ref,
            } => {
                tracing::info!(fleet = %fleet, image = %image, image_ref = %image_ref, "fleet synced");
            }
            SyncOutcome::Deleted { fleet } => {
                tracing::info!(fleet = %fleet, "fleet deleted");
            }
            SyncOutcome::Ignored { event_type } => {
                tracing::debug!(event_type = %event_type, "ignoring unhandled event type");
            }
        }
    }
}

/// Keeps outcomes in memory, in dispatch order.
#[derive(Debug, Default)]
pub struct MemorySink {
    outcomes: Mutex<Vec<SyncOutcome>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn outcomes(&self) -> Vec<SyncOutcome> {
        self.outcomes
            .lock()
            .map(|outcomes| outcomes.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().map(|o| o.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutcomeSink for MemorySink {
    fn record(&self, outcome: &SyncOutcome) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push(outcome.clone());
        }
    }
}
