//! Archive construction
//!
//! Entries are compressed and checksummed in memory, then laid out as
//! local records, directory records, and a trailer in one contiguous
//! buffer. Offsets are assigned exactly once, during layout.

use std::collections::HashSet;
use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::checksum::compute_checksum;

use super::errors::{ArchiveError, ArchiveResult};
use super::record::{
    CompressionMethod, DirectoryHeader, DosTimestamp, LocalHeader, Trailer, FLAG_UTF8_NAMES,
    FORMAT_VERSION,
};

/// Options applied to every entry of one archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub method: CompressionMethod,
    pub modified: DosTimestamp,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            method: CompressionMethod::Deflate,
            modified: DosTimestamp::EPOCH,
        }
    }
}

/// One named byte stream, prepared for layout.
///
/// `checksum` is always the CRC-32 of `raw`, never of `compressed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub raw: Vec<u8>,
    pub compressed: Vec<u8>,
    pub checksum: u32,
    pub method: CompressionMethod,
    pub offset: u64,
}

impl ArchiveEntry {
    /// Compress and checksum `raw`. The offset is assigned at layout time.
    pub fn prepare(
        name: impl Into<String>,
        raw: Vec<u8>,
        method: CompressionMethod,
    ) -> ArchiveResult<Self> {
        let name = name.into();
        if raw.len() > u32::MAX as usize || name.len() > u16::MAX as usize {
            return Err(ArchiveError::TooLarge(name));
        }

        let compressed = match method {
            CompressionMethod::Stored => raw.clone(),
            CompressionMethod::Deflate => deflate(&raw)?,
        };
        if compressed.len() > u32::MAX as usize {
            return Err(ArchiveError::TooLarge(name));
        }

        Ok(Self {
            checksum: compute_checksum(&raw),
            name,
            raw,
            compressed,
            method,
            offset: 0,
        })
    }

    fn local_header(&self, modified: DosTimestamp) -> LocalHeader {
        LocalHeader {
            version_needed: FORMAT_VERSION,
            flags: FLAG_UTF8_NAMES,
            method: self.method.as_u16(),
            modified,
            crc32: self.checksum,
            compressed_size: self.compressed.len() as u32,
            uncompressed_size: self.raw.len() as u32,
            name_len: self.name.len() as u16,
            extra_len: 0,
        }
    }
}

fn deflate(raw: &[u8]) -> ArchiveResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder
        .write_all(raw)
        .map_err(|e| ArchiveError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ArchiveError::Compression(e.to_string()))
}

/// Build an archive from an ordered list of `(name, content)` pairs.
///
/// Entry order in the output follows input order. Names must be unique.
pub fn write_archive<N, C>(entries: &[(N, C)], options: WriteOptions) -> ArchiveResult<Vec<u8>>
where
    N: AsRef<str>,
    C: AsRef<[u8]>,
{
    if entries.len() > u16::MAX as usize {
        return Err(ArchiveError::TooManyEntries(entries.len()));
    }

    let mut seen = HashSet::new();
    let mut prepared = Vec::with_capacity(entries.len());
    for (name, content) in entries {
        let name = name.as_ref();
        if !seen.insert(name.to_string()) {
            return Err(ArchiveError::DuplicateEntry(name.to_string()));
        }
        prepared.push(ArchiveEntry::prepare(
            name,
            content.as_ref().to_vec(),
            options.method,
        )?);
    }

    layout(&mut prepared, options.modified)
}

/// Serialize prepared entries, assigning each its local record offset
pub fn layout(entries: &mut [ArchiveEntry], modified: DosTimestamp) -> ArchiveResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut directory = Vec::with_capacity(entries.len());

    for entry in entries.iter_mut() {
        let offset = u32::try_from(out.len()).map_err(|_| ArchiveError::TooLarge(entry.name.clone()))?;
        entry.offset = offset as u64;

        let header = entry.local_header(modified);
        header.encode(&mut out);
        out.extend_from_slice(entry.name.as_bytes());
        out.extend_from_slice(&entry.compressed);

        directory.push(DirectoryHeader::mirror(&header, offset));
    }

    let directory_offset =
        u32::try_from(out.len()).map_err(|_| ArchiveError::TooLarge("directory".to_string()))?;
    for (record, entry) in directory.iter().zip(entries.iter()) {
        record.encode(&mut out);
        out.extend_from_slice(entry.name.as_bytes());
    }
    let directory_size = u32::try_from(out.len() - directory_offset as usize)
        .map_err(|_| ArchiveError::TooLarge("directory".to_string()))?;

    Trailer::new(entries.len() as u16, directory_size, directory_offset).encode(&mut out);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::record::{peek_signature, LOCAL_SIGNATURE};

    #[test]
    fn test_checksum_covers_raw_bytes() {
        let entry =
            ArchiveEntry::prepare("header", b"123456789".to_vec(), CompressionMethod::Deflate)
                .unwrap();
        assert_eq!(entry.checksum, 0xCBF4_3926);
        assert_ne!(entry.compressed, entry.raw);
    }

    #[test]
    fn test_stored_entry_is_verbatim() {
        let entry =
            ArchiveEntry::prepare("header", b"plain".to_vec(), CompressionMethod::Stored).unwrap();
        assert_eq!(entry.compressed, b"plain");
    }

    #[test]
    fn test_layout_offsets_and_trailer() {
        let buf = write_archive(
            &[("a", "first"), ("b", "second")],
            WriteOptions {
                method: CompressionMethod::Stored,
                ..WriteOptions::default()
            },
        )
        .unwrap();

        // first local record at 0, second right after it
        assert_eq!(peek_signature(&buf, 0), Some(LOCAL_SIGNATURE));
        let second = LocalHeader::SIZE + 1 + 5;
        assert_eq!(peek_signature(&buf, second), Some(LOCAL_SIGNATURE));

        let (trailer_offset, trailer) = Trailer::locate(&buf).unwrap();
        assert_eq!(trailer.total_entries, 2);
        assert_eq!(trailer_offset + Trailer::SIZE, buf.len());
        assert_eq!(
            trailer.directory_offset as usize + trailer.directory_size as usize,
            trailer_offset
        );

        let first_dir = DirectoryHeader::decode(&buf, trailer.directory_offset as usize).unwrap();
        assert_eq!(first_dir.local_offset, 0);
        let second_dir = DirectoryHeader::decode(
            &buf,
            trailer.directory_offset as usize + first_dir.record_len(),
        )
        .unwrap();
        assert_eq!(second_dir.local_offset as usize, second);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = write_archive(&[("a", "1"), ("a", "2")], WriteOptions::default()).unwrap_err();
        assert_eq!(err, ArchiveError::DuplicateEntry("a".into()));
    }

    #[test]
    fn test_empty_archive_is_just_a_trailer() {
        let entries: [(&str, &str); 0] = [];
        let buf = write_archive(&entries, WriteOptions::default()).unwrap();
        assert_eq!(buf.len(), Trailer::SIZE);
    }

    #[test]
    fn test_output_is_deterministic() {
        let entries = [("header", "{\"id\":\"doc-1\"}"), ("operations", "[]")];
        let a = write_archive(&entries, WriteOptions::default()).unwrap();
        let b = write_archive(&entries, WriteOptions::default()).unwrap();
        assert_eq!(a, b);
    }
}
