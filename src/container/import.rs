//! Import one container into a remote drive
//!
//! Order of work per file: validate the log, resolve the create command,
//! create the document, replay, then compare remote state with the state
//! recorded in the container. Nothing is created until the first two
//! steps succeed.

use std::time::Duration;

use tokio::time::sleep;

use crate::observability::ObservationScope;
use crate::remote::{CreateCommandCatalog, RemoteStore, DEFAULT_REQUEST_DELAY};

use super::errors::{ContainerError, ContainerResult};
use super::reader::Container;
use super::replay::{replay, ReplayOptions, ReplayTarget};
use super::state::{verify_remote_state, StateDiff, DEFAULT_MAX_REPORTED_DIFFS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub replay: ReplayOptions,
    /// Pause between the last push and the state read
    pub settle_delay: Duration,
    pub max_reported_diffs: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            replay: ReplayOptions::default(),
            settle_delay: DEFAULT_REQUEST_DELAY,
            max_reported_diffs: DEFAULT_MAX_REPORTED_DIFFS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub document_id: String,
    pub name: String,
    pub pushed: usize,
    pub batches: usize,
    /// `None` when the container recorded no state to compare against
    pub state: Option<StateDiff>,
}

impl ImportReport {
    pub fn state_match(&self) -> Option<bool> {
        self.state.as_ref().map(StateDiff::is_match)
    }
}

/// Recreate `container` as a new document in `drive_id`
pub async fn import_container<S: RemoteStore>(
    store: &S,
    catalog: &CreateCommandCatalog,
    drive_id: &str,
    container: &Container,
    options: &ImportOptions,
) -> ContainerResult<ImportReport> {
    let header = &container.header;
    let scope = ObservationScope::with_fields(
        "IMPORT",
        &[
            ("drive_id", drive_id),
            ("source_id", header.id.as_str()),
            ("document_type", header.document_type.as_str()),
        ],
    );

    container
        .operations
        .verify_index_order()
        .map_err(|violation| ContainerError::IndexOrder(violation.to_string()))?;

    let command = catalog
        .lookup(&header.document_type)
        .ok_or_else(|| ContainerError::UnknownDocumentType(header.document_type.clone()))?;

    let document_id = store.create_document(command, drive_id, &header.name).await?;

    let target = ReplayTarget {
        drive_id,
        document_id: &document_id,
        document_type: &header.document_type,
    };
    let replayed = replay(store, target, &container.operations, &options.replay).await?;

    let state = match &container.current_state {
        Some(expected) => {
            sleep(options.settle_delay).await;
            Some(
                verify_remote_state(
                    store,
                    drive_id,
                    &document_id,
                    expected,
                    options.max_reported_diffs,
                )
                .await?,
            )
        }
        None => None,
    };

    let pushed = replayed.pushed.to_string();
    let matched = state
        .as_ref()
        .map_or("unknown".to_string(), |diff| diff.is_match().to_string());
    scope.complete(&[
        ("document_id", document_id.as_str()),
        ("pushed", pushed.as_str()),
        ("state_match", matched.as_str()),
    ]);

    Ok(ImportReport {
        document_id,
        name: header.name.clone(),
        pushed: replayed.pushed,
        batches: replayed.batches,
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentHeader, Operation, OperationLog, Scope};
    use crate::remote::memory::reduce;
    use crate::remote::MemoryStore;
    use serde_json::json;

    fn operations(count: u64) -> Vec<Operation> {
        (0..count)
            .map(|index| Operation {
                id: format!("op-{}", index),
                index,
                skip: 0,
                op_type: "SET".into(),
                timestamp_utc_ms: "2024-01-01T00:00:00.000Z".into(),
                hash: format!("h{}", index),
                error: None,
                input: json!({ "count": index }),
                scope: if index % 2 == 0 { Scope::Global } else { Scope::Local },
            })
            .collect()
    }

    fn container(document_type: &str, ops: &[Operation]) -> Container {
        Container {
            header: DocumentHeader::new("src-1", document_type, "Widget"),
            operations: OperationLog::from_operations(ops),
            current_state: Some(reduce(ops)),
        }
    }

    fn fast() -> ImportOptions {
        ImportOptions {
            replay: ReplayOptions {
                batch_size: 50,
                batch_delay: Duration::ZERO,
            },
            settle_delay: Duration::ZERO,
            max_reported_diffs: 5,
        }
    }

    fn store() -> (MemoryStore, CreateCommandCatalog) {
        let store = MemoryStore::new();
        store.add_drive("target", "Target");
        store.register_type("demo/widget", "DemoWidget");
        let catalog = CreateCommandCatalog::from_commands(["DemoWidget_createDocument"]);
        (store, catalog)
    }

    #[tokio::test]
    async fn test_import_recreates_document() {
        let (store, catalog) = store();
        let ops: Vec<_> = operations(4)
            .into_iter()
            .filter(|op| op.scope == Scope::Global)
            .enumerate()
            .map(|(i, mut op)| {
                op.index = i as u64;
                op
            })
            .collect();
        let source = container("demo/widget", &ops);

        let report = import_container(&store, &catalog, "target", &source, &fast())
            .await
            .unwrap();

        assert_ne!(report.document_id, "src-1");
        assert_eq!(report.pushed, 2);
        assert_eq!(report.state_match(), Some(true));
        assert_eq!(store.calls().creates, vec!["DemoWidget_createDocument"]);
    }

    #[tokio::test]
    async fn test_unknown_type_fails_before_any_mutation() {
        let (store, catalog) = store();
        let source = container("acme/unknown", &[]);

        let err = import_container(&store, &catalog, "target", &source, &fast())
            .await
            .unwrap_err();

        assert_eq!(err, ContainerError::UnknownDocumentType("acme/unknown".into()));
        assert!(store.calls().creates.is_empty());
        assert!(store.calls().pushes.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_log_fails_before_any_mutation() {
        let (store, catalog) = store();
        let mut ops = operations(1);
        ops[0].index = 3;
        let source = container("demo/widget", &ops);

        let err = import_container(&store, &catalog, "target", &source, &fast())
            .await
            .unwrap_err();

        assert!(matches!(err, ContainerError::IndexOrder(_)));
        assert!(store.calls().creates.is_empty());
    }

    #[tokio::test]
    async fn test_log_with_retained_undo_imports() {
        let (store, catalog) = store();
        let mut ops: Vec<_> = (0..4)
            .map(|index| {
                let mut op = operations(1).remove(0);
                op.id = format!("op-{}", index);
                op.index = index;
                op.input = json!({ "count": index });
                op
            })
            .collect();
        ops[3].skip = 1;
        let source = container("demo/widget", &ops);

        let report = import_container(&store, &catalog, "target", &source, &fast())
            .await
            .unwrap();

        assert_eq!(report.pushed, 4);
        assert_eq!(report.state_match(), Some(true));
        assert_eq!(store.operations("target", &report.document_id)[3].skip, 1);
    }

    #[tokio::test]
    async fn test_state_drift_is_reported_not_raised() {
        let (store, catalog) = store();
        let source = container("demo/widget", &[]);
        let mut expected = source.clone();
        expected.current_state = Some(json!({ "global": { "name": "expected" }, "local": {} }));

        let report = import_container(&store, &catalog, "target", &expected, &fast())
            .await
            .unwrap();

        assert_eq!(report.state_match(), Some(false));
        assert_eq!(report.state.unwrap().differing_keys, vec!["global"]);
    }

    #[tokio::test]
    async fn test_missing_recorded_state_skips_verification() {
        let (store, catalog) = store();
        let mut source = container("demo/widget", &[]);
        source.current_state = None;

        let report = import_container(&store, &catalog, "target", &source, &fast())
            .await
            .unwrap();

        assert_eq!(report.state_match(), None);
        assert_eq!(store.calls().state_reads, 0);
    }
}
