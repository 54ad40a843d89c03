//! CLI-specific error types
//!
//! CLI errors end the process with a non-zero status. Failures of single
//! documents or files are not CLI errors; they are collected in the run
//! summary.

use std::fmt;
use std::io;

use crate::remote::RemoteError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file or option error
    ConfigError,
    /// Local I/O error (stdout, files)
    IoError,
    /// Remote endpoint unusable for the whole run
    RemoteError,
    /// Async runtime could not start
    RuntimeError,
    /// At least one file failed to upload
    UploadFailed,
    /// At least one file could not be inspected
    InspectFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "DOCPACK_CLI_CONFIG_ERROR",
            Self::IoError => "DOCPACK_CLI_IO_ERROR",
            Self::RemoteError => "DOCPACK_CLI_REMOTE_ERROR",
            Self::RuntimeError => "DOCPACK_CLI_RUNTIME_ERROR",
            Self::UploadFailed => "DOCPACK_CLI_UPLOAD_FAILED",
            Self::InspectFailed => "DOCPACK_CLI_INSPECT_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn runtime_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::RuntimeError, msg)
    }

    pub fn upload_failed(failed: usize, total: usize) -> Self {
        Self::new(
            CliErrorCode::UploadFailed,
            format!("{} of {} files failed to upload", failed, total),
        )
    }

    pub fn inspect_failed(failed: usize, total: usize) -> Self {
        Self::new(
            CliErrorCode::InspectFailed,
            format!("{} of {} files could not be inspected", failed, total),
        )
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<RemoteError> for CliError {
    fn from(e: RemoteError) -> Self {
        Self::new(CliErrorCode::RemoteError, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
