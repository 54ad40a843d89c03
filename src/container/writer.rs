//! Container writer
//!
//! Serializes one fetched document into the four container entries and
//! writes them as an archive. The file is written to a `.partial`
//! sibling, synced, then renamed into place; a failed write leaves no
//! partial container behind.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::archive::{write_archive, CompressionMethod, DosTimestamp, WriteOptions};
use crate::document::{FetchedDocument, OperationLog, StateEntry};

use super::errors::{ContainerError, ContainerResult};
use super::{CURRENT_STATE_ENTRY, HEADER_ENTRY, INITIAL_STATE_ENTRY, OPERATIONS_ENTRY};

fn to_json<T: Serialize>(entry: &str, value: &T) -> ContainerResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| ContainerError::Serialize {
        entry: entry.to_string(),
        reason: e.to_string(),
    })
}

/// Named JSON texts for every container entry, in archive order
pub fn build_entries(document: &FetchedDocument) -> ContainerResult<Vec<(&'static str, String)>> {
    Ok(vec![
        (HEADER_ENTRY, to_json(HEADER_ENTRY, &document.header)?),
        (
            INITIAL_STATE_ENTRY,
            to_json(INITIAL_STATE_ENTRY, &StateEntry::initial())?,
        ),
        (
            CURRENT_STATE_ENTRY,
            to_json(
                CURRENT_STATE_ENTRY,
                &StateEntry::current(document.state.clone()),
            )?,
        ),
        (
            OPERATIONS_ENTRY,
            to_json(
                OPERATIONS_ENTRY,
                &OperationLog::from_operations(&document.operations),
            )?,
        ),
    ])
}

/// Encode a document as container bytes.
///
/// Entry timestamps come from the header's last-modified time, so the
/// same document always encodes to the same bytes.
pub fn encode_container(
    document: &FetchedDocument,
    method: CompressionMethod,
) -> ContainerResult<Vec<u8>> {
    let entries = build_entries(document)?;
    let options = WriteOptions {
        method,
        modified: DosTimestamp::from_rfc3339(&document.header.last_modified_at_utc_iso),
    };
    Ok(write_archive(&entries, options)?)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> ContainerResult<()> {
    let mut file = File::create(path).map_err(|e| ContainerError::io_at(path, e))?;
    file.write_all(bytes)
        .map_err(|e| ContainerError::io_at(path, e))?;
    file.sync_all().map_err(|e| ContainerError::io_at(path, e))
}

/// Delete a partial container if it exists
pub fn cleanup_partial(path: &Path) {
    let partial = partial_path(path);
    if partial.exists() {
        let _ = fs::remove_file(partial);
    }
}

/// Write a document to `path`, creating parent directories.
///
/// Returns the number of bytes written.
pub fn write_container(
    document: &FetchedDocument,
    path: &Path,
    method: CompressionMethod,
) -> ContainerResult<u64> {
    let bytes = encode_container(document, method)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ContainerError::io_at(parent, e))?;
    }

    let partial = partial_path(path);
    let written = write_synced(&partial, &bytes)
        .and_then(|_| fs::rename(&partial, path).map_err(|e| ContainerError::io_at(path, e)));
    if let Err(e) = written {
        cleanup_partial(path);
        return Err(e);
    }

    if let Some(parent) = path.parent() {
        if let Ok(dir) = OpenOptions::new().read(true).open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{local_entry_names, read_entry_string};
    use crate::document::{DocumentHeader, Operation, Scope};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn document() -> FetchedDocument {
        let mut header = DocumentHeader::new("doc-1", "demo/widget", "Widget");
        header.revision.insert("global".into(), 2);
        header.last_modified_at_utc_iso = "2024-03-05T10:20:30.000Z".into();
        let operations = (0..2)
            .map(|index| Operation {
                id: format!("op-{}", index),
                index,
                skip: 0,
                op_type: "SET_NAME".into(),
                timestamp_utc_ms: "2024-03-05T10:20:30.000Z".into(),
                hash: format!("h{}", index),
                error: None,
                input: json!({ "name": format!("n{}", index) }),
                scope: Scope::Global,
            })
            .collect();
        FetchedDocument {
            header,
            state: json!({ "global": { "name": "n1" }, "local": {} }),
            operations,
        }
    }

    #[test]
    fn test_entries_in_order() {
        let names: Vec<_> = build_entries(&document())
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec!["header", "initial-state", "current-state", "operations"]
        );
    }

    #[test]
    fn test_written_entries_parse_back() {
        let bytes = encode_container(&document(), CompressionMethod::Deflate).unwrap();
        assert_eq!(local_entry_names(&bytes).unwrap().len(), 4);

        let header: Value =
            serde_json::from_str(&read_entry_string(&bytes, "header").unwrap().unwrap()).unwrap();
        assert_eq!(header["documentType"], "demo/widget");
        assert_eq!(header["revision"]["global"], 2);

        let ops: Value =
            serde_json::from_str(&read_entry_string(&bytes, "operations").unwrap().unwrap())
                .unwrap();
        assert_eq!(ops["global"].as_array().unwrap().len(), 2);
        assert_eq!(ops["local"].as_array().unwrap().len(), 0);
        assert_eq!(ops["global"][1]["action"]["type"], "SET_NAME");

        let current: Value = serde_json::from_str(
            &read_entry_string(&bytes, "current-state").unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(current["state"]["global"]["name"], "n1");
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = encode_container(&document(), CompressionMethod::Deflate).unwrap();
        let b = encode_container(&document(), CompressionMethod::Deflate).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_write_creates_parents_and_leaves_no_partial() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("drive").join("Folder").join("Widget.phd");

        let written = write_container(&document(), &path, CompressionMethod::Stored).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), written);
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/a/Widget.phd")),
            PathBuf::from("/tmp/a/Widget.phd.partial")
        );
    }
}
