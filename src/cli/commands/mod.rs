pub mod config;
pub mod run;

pub use config::{CheckConfigCommand, LoggingConfig};
pub use run::RunCommand;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Sync fleet images from a lifecycle feed until interrupted
    Run(RunCommand),
    /// Resolve and validate the configuration, then print it
    CheckConfig(CheckConfigCommand),
}

impl Commands {
    pub fn logging(&self) -> &LoggingConfig {
        match self {
            Commands::Run(cmd) => &cmd.logging,
            Commands::CheckConfig(cmd) => &cmd.logging,
        }
    }
}
