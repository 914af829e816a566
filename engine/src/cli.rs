//! CLI interface for Cafe Finder
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cafe Finder
///
/// Ask for café recommendations in plain language. Searches are grounded on
/// place reviews, opening hours and web articles.
#[derive(Parser, Debug)]
#[command(name = "cafe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a single question
    Ask {
        /// What you are looking for
        utterance: String,
    },

    /// Start an interactive conversation (type `exit` to leave)
    Chat,

    /// Run system diagnostics
    Doctor,

    /// Manage credentials in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

/// Credential management actions
#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Prompt for a value and store it
    Set {
        /// Secret name (e.g., google_maps_api_key)
        key: String,
    },

    /// Remove a stored value
    Delete {
        /// Secret name
        key: String,
    },
}
