//! # Archive Errors

use thiserror::Error;

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Archive codec errors
///
/// A failed read only fails that one read. The buffer is never mutated,
/// so later reads from the same buffer are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    #[error("Truncated archive: needed {needed} bytes at offset {offset}, buffer has {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Bad record signature at offset {offset}: expected {expected:#010x}, found {found:#010x}")]
    BadSignature {
        offset: usize,
        expected: u32,
        found: u32,
    },

    #[error("Unsupported compression method {method} for entry '{name}'")]
    UnsupportedMethod { name: String, method: u16 },

    #[error("Checksum mismatch for entry '{name}': recorded {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("Size mismatch for entry '{name}': recorded {expected} bytes, decoded {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("Entry name is not valid UTF-8 at offset {0}")]
    InvalidName(usize),

    #[error("Entry '{0}' is not valid UTF-8 text")]
    InvalidText(String),

    #[error("Entry '{0}' exceeds the 4 GiB limit of the archive format")]
    TooLarge(String),

    #[error("Too many entries: {0}")]
    TooManyEntries(usize),

    #[error("Duplicate entry name: {0}")]
    DuplicateEntry(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("No directory trailer found")]
    MissingTrailer,

    #[error("No directory entry for the streamed record at offset {0}")]
    MissingDirectoryEntry(usize),
}
