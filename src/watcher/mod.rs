//! FleetWatcher - bridges a lifecycle feed to a [`Broker`].
//!
//! One background task pulls events from the feed and hands each one to the
//! broker, awaiting it to completion before taking the next. Cancellation is
//! only observed between events, never in the middle of a status/pull call.

mod feed;

pub use feed::{ChannelFeed, FleetFeed, JsonLinesFeed, ThreadReader, DEFAULT_MAX_LINE_LENGTH};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{Error, FeedError, Result};
use crate::syncer::Broker;

/// Counters for events handled by the dispatch loop.
#[derive(Debug, Default)]
pub struct DispatchStats {
    dispatched: AtomicU64,
    failed: AtomicU64,
}

impl DispatchStats {
    /// Events handled without error.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Events whose dispatch returned an error.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

pub struct FleetWatcher<F, B> {
    feed: F,
    broker: Arc<B>,
    stats: Arc<DispatchStats>,
}

impl<F, B> FleetWatcher<F, B>
where
    F: FleetFeed + 'static,
    B: Broker + 'static,
{
    pub fn new(feed: F, broker: Arc<B>) -> Self {
        Self {
            feed,
            broker,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Returns an error if the feed terminates abnormally first; that is fatal
    /// to the process. A cleanly closed feed leaves the watcher idle until shutdown.
    pub async fn start(self, shutdown: CancellationToken) -> Result<()> {
        let Self {
            feed,
            broker,
            stats,
        } = self;

        let mut task = tokio::spawn(dispatch_loop(
            feed,
            broker,
            stats.clone(),
            shutdown.child_token(),
        ));
        let mut task_finished = false;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                joined = &mut task, if !task_finished => {
                    task_finished = true;
                    match joined {
                        Ok(Ok(())) => warn!("Fleet feed closed, no further events will be synced"),
                        Ok(Err(e)) => {
                            error!(error = %e, "Fleet feed terminated");
                            return Err(Error::Feed(e));
                        }
                        Err(e) => return Err(Error::Task(e.to_string())),
                    }
                }
            }
        }

        info!("shutting down syncer");

        if !task_finished {
            // Let an in-flight dispatch run to completion.
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Fleet feed failed during shutdown"),
                Err(e) => warn!(error = %e, "Dispatch task failed during shutdown"),
            }
        }

        info!(
            dispatched = stats.dispatched(),
            failed = stats.failed(),
            "Dispatch loop stopped"
        );
        Ok(())
    }
}

async fn dispatch_loop<F, B>(
    mut feed: F,
    broker: Arc<B>,
    stats: Arc<DispatchStats>,
    cancel: CancellationToken,
) -> std::result::Result<(), FeedError>
where
    F: FleetFeed,
    B: Broker,
{
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            next = feed.next_event() => match next? {
                Some(event) => event,
                None => return Ok(()),
            },
        };

        let envelope = broker.build_envelope(event);
        match broker.send_message(envelope).await {
            Ok(_) => {
                stats.dispatched.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(stage = e.stage(), error = %e, "Failed to sync fleet event");
            }
        }
    }
}
