use clap::Args;

use crate::config::{ConfigArgs, LoggingSettings};

/// Logging configuration that can be set via CLI, env vars, or config file
#[derive(Debug, Clone, Default, Args)]
pub struct LoggingConfig {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "FLEET_SYNCER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log filter directives
    #[arg(long = "log-filter", env = "FLEET_SYNCER_LOG_FILTER")]
    pub log_filter: Option<String>,
}

impl LoggingConfig {
    pub fn get_effective_level(&self) -> &str {
        match (self.verbose, self.log_level.as_deref()) {
            (v, _) if v >= 2 => "trace", // -vv flag
            (1, _) => "debug",           // -v flag
            (0, Some(level)) => level,   // Configured level
            _ => "info",                 // Default
        }
    }

    /// Fill unset options from the config file's `[logging]` section.
    pub fn merge_settings(&mut self, settings: &LoggingSettings) {
        if self.log_level.is_none() {
            self.log_level = settings.level.clone();
        }
        if self.log_filter.is_none() {
            self.log_filter = settings.filter.clone();
        }
    }
}

#[derive(Args)]
pub struct CheckConfigCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level() {
        let mut logging = LoggingConfig::default();
        assert_eq!(logging.get_effective_level(), "info");

        logging.merge_settings(&LoggingSettings {
            level: Some("warn".to_owned()),
            filter: None,
        });
        assert_eq!(logging.get_effective_level(), "warn");

        logging.verbose = 1;
        assert_eq!(logging.get_effective_level(), "debug");
        logging.verbose = 3;
        assert_eq!(logging.get_effective_level(), "trace");
    }

    #[test]
    fn test_cli_level_wins_over_file() {
        let mut logging = LoggingConfig {
            log_level: Some("error".to_owned()),
            ..Default::default()
        };
        logging.merge_settings(&LoggingSettings {
            level: Some("debug".to_owned()),
            filter: Some("fleet_image_syncer=trace".to_owned()),
        });
        assert_eq!(logging.get_effective_level(), "error");
        assert_eq!(logging.log_filter.as_deref(), Some("fleet_image_syncer=trace"));
    }
}
