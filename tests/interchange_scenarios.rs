//! End-to-end export/import scenarios against the in-memory store
//!
//! - Export writes a container whose recorded state equals the fetched one
//! - Import recreates the document under a new id with the same state
//! - Logs longer than one page and one batch survive the round trip
//! - A container of unknown type fails before any remote mutation

use std::path::{Path, PathBuf};
use std::time::Duration;

use docpack::cli::{download_drives, upload_files, DownloadSettings, RunSummary};
use docpack::container::{open_container, ExportOptions, ImportOptions, ReplayOptions};
use docpack::document::{DocumentHeader, Operation, Scope};
use docpack::remote::{FetchOptions, MemoryStore, RemoteStore};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn operations(count: u64) -> Vec<Operation> {
    (0..count)
        .map(|index| Operation {
            id: format!("op-{}", index),
            index,
            skip: 0,
            op_type: "SET_FIELD".to_string(),
            timestamp_utc_ms: format!("2024-05-01T12:00:{:02}.000Z", index % 60),
            hash: format!("hash-{}", index),
            error: None,
            input: json!({ format!("field{}", index % 7): index }),
            scope: Scope::Global,
        })
        .collect()
}

fn source_store(header: DocumentHeader, ops: Vec<Operation>) -> MemoryStore {
    let store = MemoryStore::new();
    store.add_drive("src-drive", "Source");
    store.add_document("src-drive", None, header, ops);
    store
}

fn target_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.add_drive("fresh-drive", "Fresh");
    store.register_type("demo/widget", "DemoWidget");
    store
}

fn widget_header() -> DocumentHeader {
    let mut header = DocumentHeader::new("doc-1", "demo/widget", "Widget");
    header.revision.insert("global".to_string(), 7);
    header.last_modified_at_utc_iso = "2024-05-01T12:00:00.000Z".to_string();
    header
}

fn download_settings(root: &Path, page_size: usize) -> DownloadSettings {
    DownloadSettings {
        root: root.to_path_buf(),
        extension: "phd".to_string(),
        skip_existing: false,
        export: ExportOptions {
            fetch: FetchOptions {
                page_size,
                request_delay: Duration::ZERO,
            },
            ..ExportOptions::default()
        },
        request_delay: Duration::ZERO,
    }
}

fn import_options() -> ImportOptions {
    ImportOptions {
        replay: ReplayOptions {
            batch_size: 50,
            batch_delay: Duration::ZERO,
        },
        settle_delay: Duration::ZERO,
        max_reported_diffs: 5,
    }
}

async fn export(store: &MemoryStore, root: &Path, page_size: usize) -> (RunSummary, PathBuf) {
    let mut out = Vec::new();
    let summary = download_drives(
        store,
        Some("src-drive"),
        &download_settings(root, page_size),
        &mut out,
    )
    .await
    .unwrap();
    (summary, root.join("Source").join("Widget.phd"))
}

// =============================================================================
// Export then import
// =============================================================================

#[tokio::test]
async fn test_widget_round_trip_through_container() {
    let source = source_store(widget_header(), operations(3));
    let temp = TempDir::new().unwrap();

    let (exported, path) = export(&source, temp.path(), 100).await;
    assert_eq!(exported.saved, 1);
    assert_eq!(exported.verified, 1, "round trip must match");

    let container = open_container(&path).unwrap();
    let fetched_state = source.document_state("src-drive", "doc-1").await.unwrap();
    assert_eq!(container.current_state, Some(fetched_state.clone()));
    assert_eq!(container.header, widget_header());
    assert_eq!(container.operations.global.len(), 3);
    assert_eq!(container.operations.global[2].hash, "hash-2");

    let target = target_store();
    let mut out = Vec::new();
    let imported = upload_files(&target, "fresh-drive", &[path], &import_options(), &mut out)
        .await
        .unwrap();

    assert_eq!(imported.uploaded, 1);
    assert_eq!(imported.pushed, 3);
    assert_eq!(imported.verified, 1);
    assert_eq!(imported.failed(), 0);

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("created created-1 (Widget), pushed 3, stateMatch true"));

    let replayed = target.operations("fresh-drive", "created-1");
    assert_eq!(replayed, operations(3));
    assert_eq!(
        target.document_state("fresh-drive", "created-1").await.unwrap(),
        fetched_state
    );
}

#[tokio::test]
async fn test_long_log_spans_pages_and_batches() {
    let source = source_store(widget_header(), operations(120));
    let temp = TempDir::new().unwrap();

    let (exported, path) = export(&source, temp.path(), 100).await;
    assert_eq!(exported.verified, 1);
    assert_eq!(source.calls().document_pages.len(), 2);

    let target = target_store();
    let mut out = Vec::new();
    let imported = upload_files(&target, "fresh-drive", &[path], &import_options(), &mut out)
        .await
        .unwrap();

    assert_eq!(imported.pushed, 120);
    assert_eq!(
        target.calls().pushes,
        vec![(Scope::Global, 50), (Scope::Global, 50), (Scope::Global, 20)]
    );
    let replayed = target.operations("fresh-drive", "created-1");
    let indices: Vec<u64> = replayed.iter().map(|op| op.index).collect();
    assert_eq!(indices, (0..120).collect::<Vec<_>>());
    assert_eq!(imported.verified, 1);
}

#[tokio::test]
async fn test_unknown_type_fails_alone_before_mutation() {
    let temp = TempDir::new().unwrap();

    let (_, widget_path) = export(&source_store(widget_header(), operations(3)), temp.path(), 100).await;

    let unknown_root = temp.path().join("unknown");
    let mut header = widget_header();
    header.document_type = "acme/gadget".to_string();
    let (_, unknown_path) = export(&source_store(header, operations(2)), &unknown_root, 100).await;

    let target = target_store();
    let mut out = Vec::new();
    let summary = upload_files(
        &target,
        "fresh-drive",
        &[unknown_path, widget_path],
        &import_options(),
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.uploaded, 1);
    assert!(summary.failures[0].reason.contains("acme/gadget"));
    assert_eq!(summary.failures[0].kind.as_str(), "mapping");

    let calls = target.calls();
    assert_eq!(calls.creates, vec!["DemoWidget_createDocument"]);
    assert_eq!(calls.pushes, vec![(Scope::Global, 3)]);
}

#[tokio::test]
async fn test_state_drift_is_reported_not_fatal() {
    let source = source_store(widget_header(), operations(3));
    let temp = TempDir::new().unwrap();
    let (_, path) = export(&source, temp.path(), 100).await;

    let target = target_store();
    target.override_state(
        "fresh-drive",
        "created-1",
        json!({ "global": { "field0": "drifted" }, "local": {}, "extra": 1 }),
    );
    let mut out = Vec::new();
    let summary = upload_files(&target, "fresh-drive", &[path], &import_options(), &mut out)
        .await
        .unwrap();

    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.mismatched(), 1);
    assert_eq!(
        summary.mismatches[0].diff.differing_keys,
        vec!["extra", "global"]
    );
    assert!(String::from_utf8(out).unwrap().contains("stateMatch false"));
}
