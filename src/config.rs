//! Configuration management for the fleet image syncer.
//!
//! Sources, in increasing order of precedence:
//! 1. Default configuration (embedded in binary)
//! 2. System-wide configuration file (`/etc/fleet-image-syncer/config.toml`)
//! 3. User-specified configuration file (`--config`)
//! 4. Environment variables (`FLEET_SYNCER__RUNTIME__ENDPOINT`, ...)
//! 5. `CONN_TARGET`, kept for existing deployments
//! 6. Command-line arguments
//!
//! A missing image service endpoint is a startup error.

use clap::Args;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cri::{CallTimeouts, Target};
use crate::error::{Error, Result};

/// Legacy variable naming the image service endpoint.
pub const CONN_TARGET_ENV: &str = "CONN_TARGET";

/// Configuration flags shared by the CLI commands.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Image service endpoint (unix socket path, unix://..., host:port)
    #[arg(long, value_name = "TARGET")]
    pub endpoint: Option<String>,

    /// Lifecycle event source: a file of JSON lines, or "-" for stdin
    #[arg(long, value_name = "PATH")]
    pub events: Option<String>,

    /// Deadline for ImageStatus calls, in seconds
    #[arg(long, value_name = "SECS")]
    pub status_timeout: Option<u64>,

    /// Deadline for PullImage calls, in seconds
    #[arg(long, value_name = "SECS")]
    pub pull_timeout: Option<u64>,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncerConfig {
    /// Container runtime image service
    pub runtime: RuntimeConfig,
    /// Lifecycle event feed
    pub feed: FeedConfig,
    /// Logging defaults (CLI flags win)
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Image service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Endpoint of the CRI image service
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_status_timeout")]
    pub status_timeout_secs: u64,
    #[serde(default = "default_pull_timeout")]
    pub pull_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_source")]
    pub source: String,
    /// Longest accepted event line, in bytes
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

/// Where lifecycle events are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Stdin,
    File(PathBuf),
}

impl SyncerConfig {
    /// Load configuration from all sources
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(
                config::File::with_name("/etc/fleet-image-syncer/config.toml").required(false),
            );

        // Load user config if specified
        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FLEET_SYNCER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        if let Ok(target) = env::var(CONN_TARGET_ENV) {
            builder = builder.set_override("runtime.endpoint", target)?;
        }

        let mut config: SyncerConfig = builder.build()?.try_deserialize()?;
        config.apply_args(args);

        Ok(config)
    }

    /// Override with command line args
    pub fn apply_args(&mut self, args: &ConfigArgs) {
        if let Some(endpoint) = &args.endpoint {
            self.runtime.endpoint = endpoint.clone();
        }
        if let Some(events) = &args.events {
            self.feed.source = events.clone();
        }
        if let Some(secs) = args.status_timeout {
            self.runtime.status_timeout_secs = secs;
        }
        if let Some(secs) = args.pull_timeout {
            self.runtime.pull_timeout_secs = secs;
        }
    }

    /// Reject configurations the syncer cannot start with.
    pub fn validate(&self) -> Result<()> {
        self.runtime.target()?;

        for (name, secs) in [
            ("runtime.connect_timeout_secs", self.runtime.connect_timeout_secs),
            ("runtime.status_timeout_secs", self.runtime.status_timeout_secs),
            ("runtime.pull_timeout_secs", self.runtime.pull_timeout_secs),
        ] {
            if secs == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }

        if self.feed.source.trim().is_empty() {
            return Err(Error::Config("feed.source must not be empty".to_owned()));
        }
        if self.feed.max_line_bytes == 0 {
            return Err(Error::Config(
                "feed.max_line_bytes must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }
}

impl RuntimeConfig {
    pub fn target(&self) -> Result<Target> {
        Target::parse(&self.endpoint)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn call_timeouts(&self) -> CallTimeouts {
        CallTimeouts {
            status: Duration::from_secs(self.status_timeout_secs),
            pull: Duration::from_secs(self.pull_timeout_secs),
        }
    }
}

impl FeedConfig {
    pub fn source(&self) -> FeedSource {
        match self.source.trim() {
            "-" => FeedSource::Stdin,
            path => FeedSource::File(PathBuf::from(path)),
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_status_timeout() -> u64 {
    10
}

fn default_pull_timeout() -> u64 {
    300
}

fn default_feed_source() -> String {
    "-".to_owned()
}

fn default_max_line_bytes() -> usize {
    crate::watcher::DEFAULT_MAX_LINE_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_require_endpoint() {
        let config = SyncerConfig::load(&ConfigArgs::default()).unwrap();
        assert_eq!(config.runtime.pull_timeout_secs, 300);
        assert_eq!(config.feed.source(), FeedSource::Stdin);
        assert_eq!(config.feed.max_line_bytes, 1024 * 1024);

        if env::var(CONN_TARGET_ENV).is_err() {
            assert!(matches!(config.validate(), Err(Error::Config(_))));
        }
    }

    #[test]
    fn test_file_and_args_precedence() {
        let file = write_config(
            r#"
            [runtime]
            endpoint = "unix:///run/containerd/containerd.sock"
            status_timeout_secs = 3

            [feed]
            source = "/var/run/fleet-events.jsonl"
            "#,
        );

        let args = ConfigArgs {
            config: Some(file.path().to_path_buf()),
            pull_timeout: Some(42),
            ..Default::default()
        };
        let config = SyncerConfig::load(&args).unwrap();

        assert_eq!(config.runtime.status_timeout_secs, 3);
        assert_eq!(config.runtime.pull_timeout_secs, 42);
        assert_eq!(
            config.feed.source(),
            FeedSource::File(PathBuf::from("/var/run/fleet-events.jsonl"))
        );
        assert_eq!(
            config.runtime.call_timeouts(),
            CallTimeouts {
                status: Duration::from_secs(3),
                pull: Duration::from_secs(42),
            }
        );

        let mut config = config;
        config.apply_args(&ConfigArgs {
            endpoint: Some("127.0.0.1:9000".to_owned()),
            ..Default::default()
        });
        config.validate().unwrap();
        assert_eq!(
            config.runtime.target().unwrap(),
            Target::Tcp("http://127.0.0.1:9000".to_owned())
        );
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = SyncerConfig::load(&ConfigArgs {
            endpoint: Some("/run/crio/crio.sock".to_owned()),
            ..Default::default()
        })
        .unwrap();
        config.validate().unwrap();

        config.runtime.pull_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("runtime.pull_timeout_secs"));

        config.runtime.pull_timeout_secs = 300;
        config.feed.max_line_bytes = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("feed.max_line_bytes"));
    }
}
