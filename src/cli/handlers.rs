use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{FeedSource, SyncerConfig},
    cri::{transport, ImageServiceGrpc},
    signals,
    syncer::FleetImageSyncer,
    watcher::{FleetFeed, FleetWatcher, JsonLinesFeed},
};

type GrpcSyncer = FleetImageSyncer<ImageServiceGrpc>;

pub async fn handle_run(config: SyncerConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let target = config.runtime.target()?;
    let channel = transport::connect(&target, config.runtime.connect_timeout())
        .await
        .with_context(|| format!("failed to create connection to: {}", target))?;

    let timeouts = config.runtime.call_timeouts();
    tracing::info!(
        endpoint = %target,
        status_timeout = ?timeouts.status,
        pull_timeout = ?timeouts.pull,
        "Image service client ready"
    );

    let syncer = Arc::new(FleetImageSyncer::new(ImageServiceGrpc::new(channel, timeouts)));

    let shutdown = CancellationToken::new();
    signals::cancel_on_shutdown_signal(shutdown.clone());

    let max_line_bytes = config.feed.max_line_bytes;
    let result = match config.feed.source() {
        FeedSource::Stdin => {
            let feed = JsonLinesFeed::stdin()
                .context("Failed to start stdin reader")?
                .max_line_length(max_line_bytes);
            tracing::info!("Reading fleet events from stdin");
            run_watcher(feed, syncer.clone(), shutdown).await
        }
        FeedSource::File(path) => {
            let feed = JsonLinesFeed::open(&path)
                .await
                .with_context(|| format!("Failed to open event feed {}", path.display()))?
                .max_line_length(max_line_bytes);
            tracing::info!(path = %path.display(), "Reading fleet events from file");
            run_watcher(feed, syncer.clone(), shutdown).await
        }
    };

    // Last reference to the channel goes here.
    drop(syncer);
    tracing::info!(endpoint = %target, "Closed image service connection");

    result
}

async fn run_watcher<F>(feed: F, syncer: Arc<GrpcSyncer>, shutdown: CancellationToken) -> Result<()>
where
    F: FleetFeed + 'static,
{
    FleetWatcher::new(feed, syncer)
        .start(shutdown)
        .await
        .context("failed to start fleet watcher")
}

pub fn handle_check_config(config: SyncerConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let target = config.runtime.target()?;

    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("image service target: {}", target);
    Ok(())
}
