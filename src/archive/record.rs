//! Fixed-layout archive records
//!
//! The container uses the zip layout so that generic tools can open it:
//!
//! ```text
//! [local header 0][name 0][data 0] ... [local header n][name n][data n]
//! [directory header 0][name 0] ... [directory header n][name n]
//! [trailer]
//! ```
//!
//! All integers are little-endian. Every record kind has an explicit
//! field order and a pure `encode`/`decode` pair; all offset arithmetic
//! lives in this module and its siblings, nowhere else in the crate.

use chrono::{DateTime, Datelike, Timelike};

use super::errors::{ArchiveError, ArchiveResult};

/// Local record signature ("PK\x03\x04")
pub const LOCAL_SIGNATURE: u32 = 0x0403_4b50;
/// Directory record signature ("PK\x01\x02")
pub const DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
/// Trailer signature ("PK\x05\x06")
pub const TRAILER_SIGNATURE: u32 = 0x0605_4b50;

/// Format version 2.0: deflate support, no zip64
pub const FORMAT_VERSION: u16 = 20;
/// General purpose flag bit 11: names are UTF-8
pub const FLAG_UTF8_NAMES: u16 = 0x0800;

/// Entry compression methods understood by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CompressionMethod {
    /// Raw bytes, stored verbatim
    Stored = 0,
    /// Raw DEFLATE stream, no zlib wrapper
    Deflate = 8,
}

impl CompressionMethod {
    /// Convert from the on-disk value, returns None for unsupported methods
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(CompressionMethod::Stored),
            8 => Some(CompressionMethod::Deflate),
            _ => None,
        }
    }

    /// Convert to the on-disk value
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Parse a configuration name (`stored` or `deflate`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "stored" | "store" => Some(CompressionMethod::Stored),
            "deflate" | "deflated" => Some(CompressionMethod::Deflate),
            _ => None,
        }
    }
}

/// MS-DOS packed modification time and date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosTimestamp {
    pub time: u16,
    pub date: u16,
}

impl DosTimestamp {
    /// 1980-01-01 00:00:00, the earliest representable instant
    pub const EPOCH: DosTimestamp = DosTimestamp {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// Derive a timestamp from an RFC 3339 string.
    ///
    /// Anything unparseable or outside 1980..=2107 maps to [`Self::EPOCH`].
    pub fn from_rfc3339(value: &str) -> Self {
        let Ok(parsed) = DateTime::parse_from_rfc3339(value) else {
            return Self::EPOCH;
        };
        let utc = parsed.naive_utc();
        let year = utc.year();
        if !(1980..=2107).contains(&year) {
            return Self::EPOCH;
        }

        let date = (((year - 1980) as u16) << 9) | ((utc.month() as u16) << 5) | utc.day() as u16;
        let time =
            ((utc.hour() as u16) << 11) | ((utc.minute() as u16) << 5) | (utc.second() as u16 / 2);
        Self { time, date }
    }
}

/// Bounds-checked little-endian reader over a borrowed buffer
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn take(&mut self, len: usize) -> ArchiveResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(ArchiveError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.buf.len().saturating_sub(self.pos),
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn u16(&mut self) -> ArchiveResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn u32(&mut self) -> ArchiveResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Peek the 32-bit signature at `offset`, if four bytes are available
pub(crate) fn peek_signature(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn expect_signature(cursor: &mut ByteCursor<'_>, expected: u32) -> ArchiveResult<()> {
    let offset = cursor.position();
    let found = cursor.u32()?;
    if found != expected {
        return Err(ArchiveError::BadSignature {
            offset,
            expected,
            found,
        });
    }
    Ok(())
}

/// Local record header, immediately followed by the name and the payload.
///
/// Format (30 bytes):
/// - signature (u32)
/// - version needed (u16)
/// - flags (u16)
/// - compression method (u16)
/// - modification time (u16)
/// - modification date (u16)
/// - crc32 of uncompressed bytes (u32)
/// - compressed size (u32)
/// - uncompressed size (u32)
/// - name length (u16)
/// - extra field length (u16)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub modified: DosTimestamp,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
}

impl LocalHeader {
    pub const SIZE: usize = 30;

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&LOCAL_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.version_needed.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.method.to_le_bytes());
        out.extend_from_slice(&self.modified.time.to_le_bytes());
        out.extend_from_slice(&self.modified.date.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&self.name_len.to_le_bytes());
        out.extend_from_slice(&self.extra_len.to_le_bytes());
    }

    pub fn decode(buf: &[u8], offset: usize) -> ArchiveResult<Self> {
        let mut cursor = ByteCursor::at(buf, offset);
        expect_signature(&mut cursor, LOCAL_SIGNATURE)?;
        Ok(Self {
            version_needed: cursor.u16()?,
            flags: cursor.u16()?,
            method: cursor.u16()?,
            modified: DosTimestamp {
                time: cursor.u16()?,
                date: cursor.u16()?,
            },
            crc32: cursor.u32()?,
            compressed_size: cursor.u32()?,
            uncompressed_size: cursor.u32()?,
            name_len: cursor.u16()?,
            extra_len: cursor.u16()?,
        })
    }
}

/// Directory record header, followed by the name.
///
/// Mirrors [`LocalHeader`] plus the offset at which the local record began.
/// Format (46 bytes):
/// - signature (u32)
/// - version made by (u16)
/// - version needed (u16)
/// - flags (u16)
/// - compression method (u16)
/// - modification time (u16)
/// - modification date (u16)
/// - crc32 (u32)
/// - compressed size (u32)
/// - uncompressed size (u32)
/// - name length (u16)
/// - extra field length (u16)
/// - comment length (u16)
/// - disk number start (u16)
/// - internal attributes (u16)
/// - external attributes (u32)
/// - local header offset (u32)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub modified: DosTimestamp,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
    pub comment_len: u16,
    pub disk_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub local_offset: u32,
}

impl DirectoryHeader {
    pub const SIZE: usize = 46;

    /// Build the directory record mirroring a local header
    pub fn mirror(local: &LocalHeader, local_offset: u32) -> Self {
        Self {
            version_made_by: FORMAT_VERSION,
            version_needed: local.version_needed,
            flags: local.flags,
            method: local.method,
            modified: local.modified,
            crc32: local.crc32,
            compressed_size: local.compressed_size,
            uncompressed_size: local.uncompressed_size,
            name_len: local.name_len,
            extra_len: 0,
            comment_len: 0,
            disk_start: 0,
            internal_attrs: 0,
            external_attrs: 0,
            local_offset,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&DIRECTORY_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.version_made_by.to_le_bytes());
        out.extend_from_slice(&self.version_needed.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.method.to_le_bytes());
        out.extend_from_slice(&self.modified.time.to_le_bytes());
        out.extend_from_slice(&self.modified.date.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&self.name_len.to_le_bytes());
        out.extend_from_slice(&self.extra_len.to_le_bytes());
        out.extend_from_slice(&self.comment_len.to_le_bytes());
        out.extend_from_slice(&self.disk_start.to_le_bytes());
        out.extend_from_slice(&self.internal_attrs.to_le_bytes());
        out.extend_from_slice(&self.external_attrs.to_le_bytes());
        out.extend_from_slice(&self.local_offset.to_le_bytes());
    }

    pub fn decode(buf: &[u8], offset: usize) -> ArchiveResult<Self> {
        let mut cursor = ByteCursor::at(buf, offset);
        expect_signature(&mut cursor, DIRECTORY_SIGNATURE)?;
        Ok(Self {
            version_made_by: cursor.u16()?,
            version_needed: cursor.u16()?,
            flags: cursor.u16()?,
            method: cursor.u16()?,
            modified: DosTimestamp {
                time: cursor.u16()?,
                date: cursor.u16()?,
            },
            crc32: cursor.u32()?,
            compressed_size: cursor.u32()?,
            uncompressed_size: cursor.u32()?,
            name_len: cursor.u16()?,
            extra_len: cursor.u16()?,
            comment_len: cursor.u16()?,
            disk_start: cursor.u16()?,
            internal_attrs: cursor.u16()?,
            external_attrs: cursor.u32()?,
            local_offset: cursor.u32()?,
        })
    }

    /// Total bytes this record occupies including variable-length tails
    pub fn record_len(&self) -> usize {
        Self::SIZE + self.name_len as usize + self.extra_len as usize + self.comment_len as usize
    }
}

/// End-of-directory trailer.
///
/// Format (22 bytes):
/// - signature (u32)
/// - disk number (u16)
/// - disk holding the directory (u16)
/// - entries on this disk (u16)
/// - total entries (u16)
/// - directory size in bytes (u32)
/// - directory start offset (u32)
/// - comment length (u16)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    pub disk_number: u16,
    pub directory_disk: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub directory_size: u32,
    pub directory_offset: u32,
    pub comment_len: u16,
}

impl Trailer {
    pub const SIZE: usize = 22;

    pub fn new(entries: u16, directory_size: u32, directory_offset: u32) -> Self {
        Self {
            disk_number: 0,
            directory_disk: 0,
            disk_entries: entries,
            total_entries: entries,
            directory_size,
            directory_offset,
            comment_len: 0,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&TRAILER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.disk_number.to_le_bytes());
        out.extend_from_slice(&self.directory_disk.to_le_bytes());
        out.extend_from_slice(&self.disk_entries.to_le_bytes());
        out.extend_from_slice(&self.total_entries.to_le_bytes());
        out.extend_from_slice(&self.directory_size.to_le_bytes());
        out.extend_from_slice(&self.directory_offset.to_le_bytes());
        out.extend_from_slice(&self.comment_len.to_le_bytes());
    }

    pub fn decode(buf: &[u8], offset: usize) -> ArchiveResult<Self> {
        let mut cursor = ByteCursor::at(buf, offset);
        expect_signature(&mut cursor, TRAILER_SIGNATURE)?;
        Ok(Self {
            disk_number: cursor.u16()?,
            directory_disk: cursor.u16()?,
            disk_entries: cursor.u16()?,
            total_entries: cursor.u16()?,
            directory_size: cursor.u32()?,
            directory_offset: cursor.u32()?,
            comment_len: cursor.u16()?,
        })
    }

    /// Locate the trailer by scanning backwards over the possible comment area
    pub fn locate(buf: &[u8]) -> ArchiveResult<(usize, Self)> {
        if buf.len() < Self::SIZE {
            return Err(ArchiveError::MissingTrailer);
        }
        let last = buf.len() - Self::SIZE;
        let first = last.saturating_sub(u16::MAX as usize);
        for offset in (first..=last).rev() {
            if peek_signature(buf, offset) == Some(TRAILER_SIGNATURE) {
                let trailer = Self::decode(buf, offset)?;
                if offset + Self::SIZE + trailer.comment_len as usize == buf.len() {
                    return Ok((offset, trailer));
                }
            }
        }
        Err(ArchiveError::MissingTrailer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_local() -> LocalHeader {
        LocalHeader {
            version_needed: FORMAT_VERSION,
            flags: FLAG_UTF8_NAMES,
            method: CompressionMethod::Deflate.as_u16(),
            modified: DosTimestamp::EPOCH,
            crc32: 0xCBF4_3926,
            compressed_size: 11,
            uncompressed_size: 9,
            name_len: 6,
            extra_len: 0,
        }
    }

    #[test]
    fn test_local_header_layout() {
        let mut out = Vec::new();
        sample_local().encode(&mut out);

        assert_eq!(out.len(), LocalHeader::SIZE);
        assert_eq!(&out[0..4], b"PK\x03\x04");
        // method at offset 8, crc at 14, name length at 26
        assert_eq!(u16::from_le_bytes([out[8], out[9]]), 8);
        assert_eq!(
            u32::from_le_bytes([out[14], out[15], out[16], out[17]]),
            0xCBF4_3926
        );
        assert_eq!(u16::from_le_bytes([out[26], out[27]]), 6);
    }

    #[test]
    fn test_local_header_decode_matches_encode() {
        let header = sample_local();
        let mut out = vec![0xAA, 0xBB];
        header.encode(&mut out);

        assert_eq!(LocalHeader::decode(&out, 2).unwrap(), header);
    }

    #[test]
    fn test_local_header_truncated() {
        let mut out = Vec::new();
        sample_local().encode(&mut out);
        out.truncate(20);

        let err = LocalHeader::decode(&out, 0).unwrap_err();
        assert!(matches!(err, ArchiveError::Truncated { .. }));
    }

    #[test]
    fn test_wrong_signature_rejected() {
        let mut out = Vec::new();
        Trailer::new(1, 46, 0).encode(&mut out);

        let err = LocalHeader::decode(&out, 0).unwrap_err();
        assert!(matches!(err, ArchiveError::BadSignature { offset: 0, .. }));
    }

    #[test]
    fn test_directory_header_mirrors_local() {
        let local = sample_local();
        let dir = DirectoryHeader::mirror(&local, 1234);
        let mut out = Vec::new();
        dir.encode(&mut out);

        assert_eq!(out.len(), DirectoryHeader::SIZE);
        assert_eq!(&out[0..4], b"PK\x01\x02");
        let decoded = DirectoryHeader::decode(&out, 0).unwrap();
        assert_eq!(decoded.crc32, local.crc32);
        assert_eq!(decoded.local_offset, 1234);
        assert_eq!(decoded.record_len(), DirectoryHeader::SIZE + 6);
    }

    #[test]
    fn test_trailer_locate() {
        let mut out = vec![0u8; 10];
        Trailer::new(4, 200, 10).encode(&mut out);

        let (offset, trailer) = Trailer::locate(&out).unwrap();
        assert_eq!(offset, 10);
        assert_eq!(trailer.total_entries, 4);
        assert_eq!(trailer.directory_size, 200);
    }

    #[test]
    fn test_trailer_missing() {
        assert_eq!(
            Trailer::locate(&[0u8; 40]).unwrap_err(),
            ArchiveError::MissingTrailer
        );
        assert_eq!(
            Trailer::locate(&[]).unwrap_err(),
            ArchiveError::MissingTrailer
        );
    }

    #[test]
    fn test_dos_timestamp_from_rfc3339() {
        let ts = DosTimestamp::from_rfc3339("2024-03-15T10:20:30.000Z");
        assert_eq!(ts.date, ((2024 - 1980) << 9) | (3 << 5) | 15);
        assert_eq!(ts.time, (10 << 11) | (20 << 5) | 15);
    }

    #[test]
    fn test_dos_timestamp_fallbacks() {
        assert_eq!(DosTimestamp::from_rfc3339("not a date"), DosTimestamp::EPOCH);
        assert_eq!(
            DosTimestamp::from_rfc3339("1970-01-01T00:00:00Z"),
            DosTimestamp::EPOCH
        );
    }

    #[test]
    fn test_compression_method_values() {
        assert_eq!(CompressionMethod::from_u16(0), Some(CompressionMethod::Stored));
        assert_eq!(CompressionMethod::from_u16(8), Some(CompressionMethod::Deflate));
        assert_eq!(CompressionMethod::from_u16(14), None);
        assert_eq!(
            CompressionMethod::from_name("Deflate"),
            Some(CompressionMethod::Deflate)
        );
        assert_eq!(CompressionMethod::from_name("zstd"), None);
    }
}
