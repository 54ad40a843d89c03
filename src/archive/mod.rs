//! Archive codec for docpack containers
//!
//! A container is a zip-compatible archive holding several named byte
//! streams, each optionally DEFLATE-compressed and CRC-32 protected.
//!
//! # Layout
//!
//! ```text
//! local record 0 .. local record n   (header + name + payload)
//! directory record 0 .. n            (header + name, with local offsets)
//! trailer                            (entry count, directory size/offset)
//! ```
//!
//! # Reading
//!
//! Reads scan local records from the start and never rely on the
//! trailer, matching permissive zip readers. A missing entry is
//! `Ok(None)`, not an error.

mod errors;
mod reader;
mod record;
mod writer;

pub use errors::{ArchiveError, ArchiveResult};
pub use reader::{list_entries, local_entry_names, read_entry, read_entry_string, EntryInfo};
pub use record::{CompressionMethod, DirectoryHeader, DosTimestamp, LocalHeader, Trailer};
pub use writer::{layout, write_archive, ArchiveEntry, WriteOptions};
