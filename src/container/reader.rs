//! Container reader
//!
//! Opens a container and parses its entries back into the document
//! model. `header` and `operations` are required; `current-state` is
//! optional and only used for verification.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::archive::read_entry_string;
use crate::document::{DocumentHeader, OperationLog, StateEntry};

use super::errors::{ContainerError, ContainerResult};
use super::{CURRENT_STATE_ENTRY, HEADER_ENTRY, OPERATIONS_ENTRY};

/// Parsed contents of one container
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub header: DocumentHeader,
    pub operations: OperationLog,
    pub current_state: Option<Value>,
}

fn parse_entry<T: DeserializeOwned>(bytes: &[u8], name: &str) -> ContainerResult<Option<T>> {
    match read_entry_string(bytes, name)? {
        Some(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ContainerError::parse(name, e)),
        None => Ok(None),
    }
}

fn require_entry<T: DeserializeOwned>(bytes: &[u8], name: &str) -> ContainerResult<T> {
    parse_entry(bytes, name)?.ok_or_else(|| ContainerError::MissingEntry(name.to_string()))
}

/// Parse container bytes
pub fn read_container(bytes: &[u8]) -> ContainerResult<Container> {
    let header: DocumentHeader = require_entry(bytes, HEADER_ENTRY)?;
    let operations: OperationLog = require_entry(bytes, OPERATIONS_ENTRY)?;
    let current_state =
        parse_entry::<StateEntry>(bytes, CURRENT_STATE_ENTRY)?.map(|entry| entry.state);

    Ok(Container {
        header,
        operations,
        current_state,
    })
}

/// Read and parse a container file
pub fn open_container(path: &Path) -> ContainerResult<Container> {
    let bytes = fs::read(path).map_err(|e| ContainerError::io_at(path, e))?;
    read_container(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{write_archive, ArchiveError, WriteOptions};
    use tempfile::TempDir;

    const HEADER: &str = r#"{"id":"doc-1","documentType":"demo/widget","name":"Widget","revision":{"global":1}}"#;
    const OPERATIONS: &str = r#"{"global":[{"id":"o0","index":0,"skip":0,"hash":"h0",
        "timestampUtcMs":"2024-01-01T00:00:00.000Z","error":null,
        "action":{"id":"o0","type":"SET_NAME","timestampUtcMs":"2024-01-01T00:00:00.000Z",
        "input":{"name":"w"},"scope":"global"}}],"local":[]}"#;

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        write_archive(entries, WriteOptions::default()).unwrap()
    }

    #[test]
    fn test_read_full_container() {
        let bytes = archive(&[
            ("header", HEADER),
            ("current-state", r#"{"state":{"global":{"name":"w"}}}"#),
            ("operations", OPERATIONS),
        ]);
        let container = read_container(&bytes).unwrap();
        assert_eq!(container.header.document_type, "demo/widget");
        assert_eq!(container.operations.global.len(), 1);
        assert_eq!(container.operations.global[0].action.action_type, "SET_NAME");
        assert_eq!(
            container.current_state.unwrap()["global"]["name"],
            "w"
        );
    }

    #[test]
    fn test_current_state_is_optional() {
        let bytes = archive(&[("header", HEADER), ("operations", OPERATIONS)]);
        assert!(read_container(&bytes).unwrap().current_state.is_none());
    }

    #[test]
    fn test_missing_header() {
        let bytes = archive(&[("operations", OPERATIONS)]);
        assert_eq!(
            read_container(&bytes).unwrap_err(),
            ContainerError::MissingEntry("header".into())
        );
    }

    #[test]
    fn test_malformed_operations() {
        let bytes = archive(&[("header", HEADER), ("operations", "[1,2")]);
        assert!(matches!(
            read_container(&bytes).unwrap_err(),
            ContainerError::Parse { entry, .. } if entry == "operations"
        ));
    }

    #[test]
    fn test_truncated_container() {
        let bytes = archive(&[("header", HEADER), ("operations", OPERATIONS)]);
        let err = read_container(&bytes[..40]).unwrap_err();
        assert!(matches!(err, ContainerError::Archive(ArchiveError::Truncated { .. })));
    }

    #[test]
    fn test_not_an_archive() {
        assert_eq!(
            read_container(b"plain text, no records").unwrap_err(),
            ContainerError::MissingEntry("header".into())
        );
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(
            read_container(&[]).unwrap_err(),
            ContainerError::MissingEntry("header".into())
        );
    }

    #[test]
    fn test_open_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = open_container(&temp.path().join("nope.phd")).unwrap_err();
        assert!(matches!(err, ContainerError::Io { .. }));
    }
}
