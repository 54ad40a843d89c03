//! CLI module for docpack
//!
//! Provides command-line interface for:
//! - download: export drives into container files
//! - upload: recreate documents from container files
//! - inspect: print container contents

mod args;
mod commands;
mod config;
mod errors;
mod summary;

pub use args::{Cli, Command};
pub use commands::{
    download_drives, inspect_files, run, run_command, upload_files, DownloadSettings,
};
pub use config::{parse_severity, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use summary::{Failure, Mismatch, Outcome, RunSummary};
