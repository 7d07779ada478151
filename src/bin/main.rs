//! fleet-image-syncer binary.
//!
//! Reads fleet lifecycle events and pre-pulls the images they require through the
//! container runtime's CRI ImageService.

use anyhow::Result;
use clap::Parser;
use fleet_image_syncer::{
    cli::{commands::Commands, handle_check_config, handle_run, Cli},
    config::SyncerConfig,
};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_args = match &cli.command {
        Commands::Run(cmd) => &cmd.config,
        Commands::CheckConfig(cmd) => &cmd.config,
    };
    let config = SyncerConfig::load(config_args)?;

    let mut logging = cli.command.logging().clone();
    logging.merge_settings(&config.logging);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(
                    logging
                        .get_effective_level()
                        .parse::<LevelFilter>()
                        .unwrap_or(LevelFilter::INFO)
                        .into(),
                )
                .parse_lossy(logging.log_filter.as_deref().unwrap_or("")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    match cli.command {
        Commands::Run(_) => {
            info!("fleet-image-syncer starting up");
            handle_run(config).await?
        }
        Commands::CheckConfig(_) => handle_check_config(config)?,
    }

    Ok(())
}
