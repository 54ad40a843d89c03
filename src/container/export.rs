//! Export one remote document into a container file

use std::path::{Path, PathBuf};

use crate::archive::CompressionMethod;
use crate::observability::ObservationScope;
use crate::remote::{fetch_document, FetchOptions, RemoteStore};

use super::errors::ContainerResult;
use super::state::{StateDiff, DEFAULT_MAX_REPORTED_DIFFS};
use super::verifier::verify_round_trip;
use super::writer::write_container;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub fetch: FetchOptions,
    pub method: CompressionMethod,
    pub max_reported_diffs: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fetch: FetchOptions::default(),
            method: CompressionMethod::Deflate,
            max_reported_diffs: DEFAULT_MAX_REPORTED_DIFFS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub document_id: String,
    pub path: PathBuf,
    pub operations: usize,
    pub bytes: u64,
    /// Fetched state vs. state re-read from the written file
    pub round_trip: StateDiff,
}

/// Fetch a document, write it to `path`, and verify the written file
pub async fn export_document<S: RemoteStore>(
    store: &S,
    drive_id: &str,
    document_id: &str,
    path: &Path,
    options: &ExportOptions,
) -> ContainerResult<ExportReport> {
    let path_text = path.display().to_string();
    let scope = ObservationScope::with_fields(
        "EXPORT",
        &[
            ("drive_id", drive_id),
            ("document_id", document_id),
            ("path", path_text.as_str()),
        ],
    );

    let document = fetch_document(store, drive_id, document_id, &options.fetch).await?;
    let bytes = write_container(&document, path, options.method)?;
    let round_trip = verify_round_trip(path, &document.state, options.max_reported_diffs)?;

    let operations = document.operations.len().to_string();
    let matched = round_trip.is_match().to_string();
    scope.complete(&[
        ("operations", operations.as_str()),
        ("round_trip_match", matched.as_str()),
    ]);

    Ok(ExportReport {
        document_id: document_id.to_string(),
        path: path.to_path_buf(),
        operations: document.operations.len(),
        bytes,
        round_trip: round_trip.diff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::open_container;
    use crate::document::{DocumentHeader, Operation, Scope};
    use crate::remote::{MemoryStore, RemoteError};
    use crate::container::ContainerError;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn options() -> ExportOptions {
        ExportOptions {
            fetch: FetchOptions {
                page_size: 2,
                request_delay: Duration::ZERO,
            },
            ..ExportOptions::default()
        }
    }

    fn store_with_document(operations: u64) -> MemoryStore {
        let store = MemoryStore::new();
        store.add_drive("drive", "Drive");
        let ops = (0..operations)
            .map(|index| Operation {
                id: format!("op-{}", index),
                index,
                skip: 0,
                op_type: "SET".into(),
                timestamp_utc_ms: "2024-01-01T00:00:00.000Z".into(),
                hash: format!("h{}", index),
                error: None,
                input: json!({ "count": index }),
                scope: Scope::Global,
            })
            .collect();
        store.add_document(
            "drive",
            None,
            DocumentHeader::new("doc-1", "demo/widget", "Widget"),
            ops,
        );
        store
    }

    #[tokio::test]
    async fn test_export_writes_full_log() {
        let store = store_with_document(5);
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Widget.phd");

        let report = export_document(&store, "drive", "doc-1", &path, &options())
            .await
            .unwrap();

        assert_eq!(report.operations, 5);
        assert!(report.round_trip.is_match());
        assert_eq!(store.calls().document_pages.len(), 3);

        let container = open_container(&path).unwrap();
        assert_eq!(container.operations.global.len(), 5);
        assert_eq!(container.current_state.unwrap()["global"]["count"], 4);
    }

    #[tokio::test]
    async fn test_export_missing_document_writes_nothing() {
        let store = store_with_document(0);
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Ghost.phd");

        let err = export_document(&store, "drive", "ghost", &path, &options())
            .await
            .unwrap_err();

        assert!(matches!(err, ContainerError::Remote(RemoteError::NotFound(_))));
        assert!(!path.exists());
    }
}
