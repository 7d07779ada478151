//! Command-line interface module.
//!
//! This module provides the CLI functionality for:
//! - Running the syncer against a lifecycle feed
//! - Checking the resolved configuration

pub mod commands;
pub mod handlers;
pub mod options;

pub use handlers::{handle_check_config, handle_run};
pub use options::Cli;
