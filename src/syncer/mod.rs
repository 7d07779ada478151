//! Fleet image synchronization.
//!
//! [`FleetImageSyncer`] turns each fleet lifecycle envelope into at most one
//! presence check and at most one pull against the runtime's image service:
//!
//! ```text
//! added | updated  → ImageStatus(image) ── present ──→ AlreadyPresent
//!                                       └─ absent ───→ PullImage(image) → Synced
//! deleted          → Deleted (no runtime call)
//! anything else    → Ignored
//! ```

mod outcome;

pub use outcome::{MemorySink, OutcomeSink, SyncOutcome, TracingSink};

use async_trait::async_trait;
use std::sync::Arc;
use tonic::Status;

use crate::cri::{image_status_request, pull_image_request, ImageService};
use crate::error::SyncError;
use crate::events::{unwrap_fleet, Envelope, EventType, LifecycleEvent};
use crate::fleet::{Fleet, FleetSnapshot};

/// Receiving end of the lifecycle feed.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Normalize an event into an envelope. Never fails.
    fn build_envelope(&self, event: LifecycleEvent) -> Envelope;

    /// Act on one envelope, to completion.
    async fn send_message(&self, envelope: Envelope) -> Result<SyncOutcome, SyncError>;
}

/// Keeps the runtime image cache in line with the images fleets require.
pub struct FleetImageSyncer<C> {
    image_client: C,
    sink: Arc<dyn OutcomeSink>,
}

impl<C: ImageService> FleetImageSyncer<C> {
    /// Syncer reporting outcomes through `tracing`.
    pub fn new(image_client: C) -> Self {
        Self::with_sink(image_client, Arc::new(TracingSink))
    }

    pub fn with_sink(image_client: C, sink: Arc<dyn OutcomeSink>) -> Self {
        Self { image_client, sink }
    }

    /// Whether the runtime holds `image`. Present means a non-empty image id.
    pub async fn check_image_status(&self, image: &str) -> Result<bool, Status> {
        let status = self
            .image_client
            .image_status(image_status_request(image))
            .await?;

        Ok(status.image.is_some_and(|image| !image.id.is_empty()))
    }

    /// Pull `image`, returning the reference the runtime resolved it to.
    pub async fn pull_image(&self, image: &str) -> Result<String, Status> {
        let response = self.image_client.pull_image(pull_image_request(image)).await?;
        Ok(response.image_ref)
    }

    /// Presence-then-pull for the fleet's first container image.
    pub async fn handle_added_updated(&self, fleet: &Fleet) -> Result<SyncOutcome, SyncError> {
        let snapshot = FleetSnapshot::from_fleet(fleet)?;

        let present = self
            .check_image_status(&snapshot.required_image)
            .await
            .map_err(SyncError::StatusQuery)?;

        if present {
            return Ok(self.record(SyncOutcome::AlreadyPresent {
                fleet: snapshot.name,
                image: snapshot.required_image,
            }));
        }

        tracing::debug!(
            fleet = %snapshot.name,
            image = %snapshot.required_image,
            "Image not present, pulling"
        );

        let image_ref = self
            .pull_image(&snapshot.required_image)
            .await
            .map_err(SyncError::Pull)?;

        Ok(self.record(SyncOutcome::Synced {
            fleet: snapshot.name,
            image: snapshot.required_image,
            image_ref,
        }))
    }

    fn record(&self, outcome: SyncOutcome) -> SyncOutcome {
        self.sink.record(&outcome);
        outcome
    }
}

#[async_trait]
impl<C: ImageService> Broker for FleetImageSyncer<C> {
    fn build_envelope(&self, event: LifecycleEvent) -> Envelope {
        Envelope::from_event(event)
    }

    async fn send_message(&self, envelope: Envelope) -> Result<SyncOutcome, SyncError> {
        let event_type = envelope.event_type();
        let fleet = unwrap_fleet(&envelope.message)?;

        tracing::debug!(event_type = ?event_type, fleet = %fleet.name(), "Dispatching fleet event");

        let outcome = match event_type {
            EventType::Added | EventType::Updated => {
                return self.handle_added_updated(fleet).await;
            }
            // The image stays cached: game servers of this fleet may still be terminating.
            EventType::Deleted => SyncOutcome::Deleted {
                fleet: fleet.name().to_owned(),
            },
            EventType::Unhandled(tag) => SyncOutcome::Ignored { event_type: tag },
        };

        Ok(self.record(outcome))
    }
}
