//! Round-trip verification
//!
//! Run after every write: reopen the file, parse `current-state`, and
//! compare it with the state that was fetched. A difference is reported,
//! never raised.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::errors::{ContainerError, ContainerResult};
use super::reader::open_container;
use super::state::{diff_states, StateDiff};
use super::CURRENT_STATE_ENTRY;

/// Result of re-reading a freshly written container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripReport {
    pub path: PathBuf,
    pub diff: StateDiff,
}

impl RoundTripReport {
    pub fn is_match(&self) -> bool {
        self.diff.is_match()
    }
}

/// Re-read `path` and compare its recorded state with `expected`
pub fn verify_round_trip(
    path: &Path,
    expected: &Value,
    max_reported: usize,
) -> ContainerResult<RoundTripReport> {
    let container = open_container(path)?;
    let recorded = container
        .current_state
        .ok_or_else(|| ContainerError::MissingEntry(CURRENT_STATE_ENTRY.to_string()))?;

    Ok(RoundTripReport {
        path: path.to_path_buf(),
        diff: diff_states(expected, &recorded, max_reported),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::CompressionMethod;
    use crate::container::write_container;
    use crate::document::{DocumentHeader, FetchedDocument};
    use serde_json::json;
    use tempfile::TempDir;

    fn written(state: Value) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.phd");
        let document = FetchedDocument {
            header: DocumentHeader::new("doc-1", "demo/widget", "Widget"),
            state,
            operations: Vec::new(),
        };
        write_container(&document, &path, CompressionMethod::Deflate).unwrap();
        (temp, path)
    }

    #[test]
    fn test_round_trip_matches() {
        let state = json!({ "global": { "name": "w", "tags": ["a", "b"] }, "local": {} });
        let (_temp, path) = written(state.clone());
        let report = verify_round_trip(&path, &state, 5).unwrap();
        assert!(report.is_match());
        assert_eq!(report.path, path);
    }

    #[test]
    fn test_round_trip_reports_difference() {
        let (_temp, path) = written(json!({ "global": { "name": "w" }, "local": {} }));
        let expected = json!({ "global": { "name": "other" }, "local": {} });
        let report = verify_round_trip(&path, &expected, 5).unwrap();
        assert!(!report.is_match());
        assert_eq!(report.diff.differing_keys, vec!["global"]);
    }
}
