//! fleet-image-syncer: keeps a node's container image cache in step with its fleets.
//!
//! On every add/update of a fleet definition the syncer resolves the image the
//! fleet's game servers run, asks the container runtime's CRI ImageService whether
//! it is cached, and pulls it only when it is not. Deleted fleets are observed but
//! never trigger image removal.
//!
//! # Example
//!
//! ```ignore
//! use fleet_image_syncer::{cri, FleetImageSyncer, FleetWatcher, JsonLinesFeed};
//!
//! let target = cri::Target::parse("unix:///run/containerd/containerd.sock")?;
//! let channel = cri::transport::connect(&target, Duration::from_secs(10)).await?;
//! let syncer = Arc::new(FleetImageSyncer::new(cri::ImageServiceGrpc::new(channel, Default::default())));
//!
//! FleetWatcher::new(JsonLinesFeed::stdin()?, syncer).start(shutdown).await?;
//! ```

pub mod cli;
pub mod config;
pub mod cri;
pub mod error;
pub mod events;
pub mod fleet;
pub mod signals;
pub mod syncer;
pub mod watcher;

// Re-export commonly used types
pub use config::SyncerConfig;
pub use error::{Error, Result, SyncError};
pub use events::{Envelope, EventKind, LifecycleEvent, Payload};
pub use fleet::{Fleet, FleetSnapshot};
pub use syncer::{Broker, FleetImageSyncer, OutcomeSink, SyncOutcome};
pub use watcher::{ChannelFeed, FleetFeed, FleetWatcher, JsonLinesFeed};
