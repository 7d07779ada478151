//! CRI ImageService client
//!
//! Talks to the container runtime's `runtime.v1.ImageService` over a single
//! long-lived gRPC channel (TCP or local domain socket).
//!
//! # Architecture
//!
//! ```text
//! FleetImageSyncer
//!     │
//!     └── dyn ImageService            (seam, fakes in tests)
//!           │
//!           └── ImageServiceGrpc      (tonic, per-call deadlines)
//!                 │
//!                 └── transport::connect(Target)  → Channel
//! ```

mod client;
pub mod transport;

/// Checked-in prost/tonic code for the `runtime.v1` ImageService subset.
#[allow(clippy::all)]
pub mod pb {
    include!("../generated/runtime.v1.rs");
}

pub use client::{
    image_status_request, pull_image_request, CallTimeouts, ImageService, ImageServiceGrpc,
};
pub use transport::Target;
