//! CLI argument definitions using clap
//!
//! Commands:
//! - docpack download <endpoint> [drive-id] [--skip-existing]
//! - docpack upload <endpoint> <drive-id> <file>...
//! - docpack inspect <file>...

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Export remote documents into container files and import them back
#[derive(Parser, Debug)]
#[command(name = "docpack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Minimum log severity (trace, info, warn, error, fatal)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Save every document of one drive, or of all drives, as containers
    Download {
        /// GraphQL endpoint URL
        endpoint: String,

        /// Drive to export; all drives when omitted
        drive_id: Option<String>,

        /// Keep container files that already exist on disk
        #[arg(long)]
        skip_existing: bool,

        /// Root of the download tree (overrides the config file)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Recreate documents from containers in a remote drive
    Upload {
        /// GraphQL endpoint URL
        endpoint: String,

        /// Target drive
        drive_id: String,

        /// Container files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the entries and header of container files
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
