//! Archive entry extraction
//!
//! Reads scan local records from the start of the buffer and stop at the
//! first record whose name matches. The directory trailer is not trusted
//! for reads; it is consulted only to recover sizes for records written
//! with a trailing data descriptor, and by [`list_entries`].
//!
//! Reads never mutate the buffer, so a failed read cannot affect later
//! reads from the same buffer.

use std::io::Read;

use flate2::read::DeflateDecoder;

use crate::checksum::compute_checksum;

use super::errors::{ArchiveError, ArchiveResult};
use super::record::{
    peek_signature, ByteCursor, CompressionMethod, DirectoryHeader, LocalHeader, Trailer,
    LOCAL_SIGNATURE,
};

/// General purpose flag bit 3: sizes and CRC follow the data
const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
/// Optional data descriptor signature ("PK\x07\x08")
const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;
/// Upper bound on the buffer reserved up front for an inflated entry
const MAX_RESERVED_OUTPUT: u32 = 1 << 20;

/// Directory view of one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub method: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub local_offset: u32,
}

/// A local record located in the buffer, payload not yet decoded
struct LocalRecord<'a> {
    name: &'a [u8],
    method: u16,
    crc32: u32,
    uncompressed_size: u32,
    data: &'a [u8],
    next: usize,
}

fn local_record_at(buf: &[u8], offset: usize) -> ArchiveResult<LocalRecord<'_>> {
    let header = LocalHeader::decode(buf, offset)?;
    let mut cursor = ByteCursor::at(buf, offset + LocalHeader::SIZE);
    let name = cursor.take(header.name_len as usize)?;
    cursor.take(header.extra_len as usize)?;

    let (crc32, compressed_size, uncompressed_size) =
        if header.flags & FLAG_DATA_DESCRIPTOR != 0 && header.compressed_size == 0 {
            let info = directory_info_for(buf, offset)?;
            (info.crc32, info.compressed_size, info.uncompressed_size)
        } else {
            (
                header.crc32,
                header.compressed_size,
                header.uncompressed_size,
            )
        };

    let data = cursor.take(compressed_size as usize)?;
    if header.flags & FLAG_DATA_DESCRIPTOR != 0 {
        if peek_signature(buf, cursor.position()) == Some(DATA_DESCRIPTOR_SIGNATURE) {
            cursor.take(4)?;
        }
        cursor.take(12)?;
    }

    Ok(LocalRecord {
        name,
        method: header.method,
        crc32,
        uncompressed_size,
        data,
        next: cursor.position(),
    })
}

fn directory_info_for(buf: &[u8], local_offset: usize) -> ArchiveResult<EntryInfo> {
    list_entries(buf)?
        .into_iter()
        .find(|info| info.local_offset as usize == local_offset)
        .ok_or(ArchiveError::MissingDirectoryEntry(local_offset))
}

fn decode_payload(record: &LocalRecord<'_>) -> ArchiveResult<Vec<u8>> {
    let name = String::from_utf8_lossy(record.name).into_owned();
    let raw = match CompressionMethod::from_u16(record.method) {
        Some(CompressionMethod::Stored) => record.data.to_vec(),
        Some(CompressionMethod::Deflate) => {
            // one byte past the recorded size is enough to detect an overrun
            let limit = record.uncompressed_size as u64 + 1;
            let mut raw =
                Vec::with_capacity(record.uncompressed_size.min(MAX_RESERVED_OUTPUT) as usize);
            DeflateDecoder::new(record.data)
                .take(limit)
                .read_to_end(&mut raw)
                .map_err(|e| ArchiveError::Compression(format!("{}: {}", name, e)))?;
            raw
        }
        None => {
            return Err(ArchiveError::UnsupportedMethod {
                name,
                method: record.method,
            })
        }
    };

    if raw.len() as u64 != record.uncompressed_size as u64 {
        return Err(ArchiveError::SizeMismatch {
            name,
            expected: record.uncompressed_size as u64,
            actual: raw.len() as u64,
        });
    }

    let actual = compute_checksum(&raw);
    if actual != record.crc32 {
        return Err(ArchiveError::ChecksumMismatch {
            name,
            expected: record.crc32,
            actual,
        });
    }

    Ok(raw)
}

/// Read the decompressed bytes of the entry called `name`.
///
/// Returns `Ok(None)` when the scan runs out of local records without a
/// match. Malformed or truncated records, unsupported methods, and
/// checksum failures are errors for this read only.
pub fn read_entry(buf: &[u8], name: &str) -> ArchiveResult<Option<Vec<u8>>> {
    let mut offset = 0;
    while peek_signature(buf, offset) == Some(LOCAL_SIGNATURE) {
        let record = local_record_at(buf, offset)?;
        if record.name == name.as_bytes() {
            return decode_payload(&record).map(Some);
        }
        offset = record.next;
    }
    Ok(None)
}

/// Read an entry and decode it as UTF-8 text
pub fn read_entry_string(buf: &[u8], name: &str) -> ArchiveResult<Option<String>> {
    match read_entry(buf, name)? {
        Some(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| ArchiveError::InvalidText(name.to_string())),
        None => Ok(None),
    }
}

/// Names of all local records, in file order
pub fn local_entry_names(buf: &[u8]) -> ArchiveResult<Vec<String>> {
    let mut names = Vec::new();
    let mut offset = 0;
    while peek_signature(buf, offset) == Some(LOCAL_SIGNATURE) {
        let record = local_record_at(buf, offset)?;
        names.push(String::from_utf8_lossy(record.name).into_owned());
        offset = record.next;
    }
    Ok(names)
}

/// List entries from the directory trailer
pub fn list_entries(buf: &[u8]) -> ArchiveResult<Vec<EntryInfo>> {
    let (_, trailer) = Trailer::locate(buf)?;
    let mut offset = trailer.directory_offset as usize;
    let mut entries = Vec::with_capacity(trailer.total_entries as usize);

    for _ in 0..trailer.total_entries {
        let header = DirectoryHeader::decode(buf, offset)?;
        let mut cursor = ByteCursor::at(buf, offset + DirectoryHeader::SIZE);
        let name = cursor.take(header.name_len as usize)?;
        let name = std::str::from_utf8(name)
            .map_err(|_| ArchiveError::InvalidName(offset + DirectoryHeader::SIZE))?
            .to_string();

        entries.push(EntryInfo {
            name,
            method: header.method,
            crc32: header.crc32,
            compressed_size: header.compressed_size,
            uncompressed_size: header.uncompressed_size,
            local_offset: header.local_offset,
        });
        offset += header.record_len();
    }

    Ok(entries)
}
