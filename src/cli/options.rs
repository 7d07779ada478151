use clap::Parser;

use crate::cli::commands::Commands;

/// Pre-pull fleet images into the node's container runtime.
#[derive(Parser)]
#[command(
    name = "fleet-image-syncer",
    version,
    about,
    after_help = "The image service endpoint may also be given through CONN_TARGET."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}
