//! In-memory remote store
//!
//! Holds drives and documents in process. State is derived from the
//! operation log with a merge reducer (see [`reduce`]), so replaying an
//! exported log into a fresh document reproduces the exported state.
//! Every call is recorded for inspection.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Map, Value};

use crate::document::{DocumentHeader, Operation, Scope};
use crate::drive::{Drive, DriveNode};

use super::errors::{RemoteError, RemoteResult};
use super::store::{DocumentPage, PageRequest, PushOutcome, RemoteStore, ReplayBatch};

/// Merge reducer: object inputs are merged key by key into the state of
/// the operation's scope; any other input is stored under the operation
/// type. Operations that recorded an error are not applied.
pub fn reduce(operations: &[Operation]) -> Value {
    let mut global = Map::new();
    let mut local = Map::new();
    for op in operations.iter().filter(|op| op.error.is_none()) {
        let target = match op.scope {
            Scope::Global => &mut global,
            Scope::Local => &mut local,
        };
        match &op.input {
            Value::Object(fields) => {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
            other => {
                target.insert(op.op_type.clone(), other.clone());
            }
        }
    }
    json!({ "global": global, "local": local })
}

/// Calls observed by a [`MemoryStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub drive_listings: usize,
    pub drive_details: usize,
    pub document_pages: Vec<PageRequest>,
    pub state_reads: usize,
    pub capability_listings: usize,
    pub creates: Vec<String>,
    /// (scope, batch length) per push, in order
    pub pushes: Vec<(Scope, usize)>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    header: DocumentHeader,
    operations: Vec<Operation>,
}

#[derive(Debug, Default)]
struct Inner {
    drives: BTreeMap<String, Drive>,
    documents: BTreeMap<(String, String), StoredDocument>,
    /// create command name -> document type
    commands: BTreeMap<String, String>,
    /// state overrides applied on read, for simulating drift
    state_overrides: BTreeMap<(String, String), Value>,
    reject_pushes_after: Option<usize>,
    next_id: usize,
    calls: CallLog,
}

/// Remote store kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an empty drive
    pub fn add_drive(&self, id: &str, name: &str) {
        self.lock().drives.insert(
            id.to_string(),
            Drive {
                id: id.to_string(),
                name: name.to_string(),
                slug: id.to_string(),
                icon: None,
                nodes: Vec::new(),
            },
        );
    }

    /// Add a folder node to a drive
    pub fn add_folder(&self, drive_id: &str, folder: DriveNode) {
        if let Some(drive) = self.lock().drives.get_mut(drive_id) {
            drive.nodes.push(folder);
        }
    }

    /// Add a document with an existing log. Its state is derived by [`reduce`].
    pub fn add_document(
        &self,
        drive_id: &str,
        parent_folder: Option<&str>,
        header: DocumentHeader,
        operations: Vec<Operation>,
    ) {
        let mut inner = self.lock();
        if let Some(drive) = inner.drives.get_mut(drive_id) {
            drive.nodes.push(DriveNode::file(
                &header.id,
                &header.name,
                parent_folder,
                &header.document_type,
            ));
        }
        inner.documents.insert(
            (drive_id.to_string(), header.id.clone()),
            StoredDocument { header, operations },
        );
    }

    /// Register a document type under a create command prefix,
    /// e.g. `("demo/widget", "DemoWidget")` adds `DemoWidget_createDocument`.
    pub fn register_type(&self, document_type: &str, prefix: &str) {
        self.lock().commands.insert(
            format!("{}{}", prefix, super::catalog::CREATE_SUFFIX),
            document_type.to_string(),
        );
    }

    /// Reject every push after the first `accepted` ones
    pub fn reject_pushes_after(&self, accepted: usize) {
        self.lock().reject_pushes_after = Some(accepted);
    }

    /// Report `state` for a document regardless of its log
    pub fn override_state(&self, drive_id: &str, document_id: &str, state: Value) {
        self.lock()
            .state_overrides
            .insert((drive_id.to_string(), document_id.to_string()), state);
    }

    pub fn calls(&self) -> CallLog {
        self.lock().calls.clone()
    }

    /// Operations currently stored for a document
    pub fn operations(&self, drive_id: &str, document_id: &str) -> Vec<Operation> {
        self.lock()
            .documents
            .get(&(drive_id.to_string(), document_id.to_string()))
            .map(|doc| doc.operations.clone())
            .unwrap_or_default()
    }

    fn state_of(inner: &Inner, key: &(String, String), doc: &StoredDocument) -> Value {
        inner
            .state_overrides
            .get(key)
            .cloned()
            .unwrap_or_else(|| reduce(&doc.operations))
    }
}

impl RemoteStore for MemoryStore {
    async fn list_drives(&self) -> RemoteResult<Vec<String>> {
        let mut inner = self.lock();
        inner.calls.drive_listings += 1;
        Ok(inner.drives.keys().cloned().collect())
    }

    async fn drive(&self, drive_id: &str) -> RemoteResult<Drive> {
        let mut inner = self.lock();
        inner.calls.drive_details += 1;
        inner
            .drives
            .get(drive_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("drive {}", drive_id)))
    }

    async fn document_page(
        &self,
        drive_id: &str,
        document_id: &str,
        page: PageRequest,
    ) -> RemoteResult<DocumentPage> {
        let mut inner = self.lock();
        inner.calls.document_pages.push(page);
        let key = (drive_id.to_string(), document_id.to_string());
        let doc = inner
            .documents
            .get(&key)
            .ok_or_else(|| RemoteError::NotFound(format!("document {}", document_id)))?;

        Ok(DocumentPage {
            header: doc.header.clone(),
            state: Self::state_of(&inner, &key, doc),
            operations: doc
                .operations
                .iter()
                .skip(page.skip)
                .take(page.first)
                .cloned()
                .collect(),
        })
    }

    async fn document_state(&self, drive_id: &str, document_id: &str) -> RemoteResult<Value> {
        let mut inner = self.lock();
        inner.calls.state_reads += 1;
        let key = (drive_id.to_string(), document_id.to_string());
        let doc = inner
            .documents
            .get(&key)
            .ok_or_else(|| RemoteError::NotFound(format!("document {}", document_id)))?;
        Ok(Self::state_of(&inner, &key, doc))
    }

    async fn create_commands(&self) -> RemoteResult<Vec<String>> {
        let mut inner = self.lock();
        inner.calls.capability_listings += 1;
        Ok(inner.commands.keys().cloned().collect())
    }

    async fn create_document(
        &self,
        command: &str,
        drive_id: &str,
        name: &str,
    ) -> RemoteResult<String> {
        let mut inner = self.lock();
        inner.calls.creates.push(command.to_string());
        let document_type = inner
            .commands
            .get(command)
            .cloned()
            .ok_or_else(|| RemoteError::GraphQl(format!("Unknown mutation {}", command)))?;
        if !inner.drives.contains_key(drive_id) {
            return Err(RemoteError::NotFound(format!("drive {}", drive_id)));
        }

        inner.next_id += 1;
        let id = format!("created-{}", inner.next_id);
        let header = DocumentHeader::new(id.clone(), document_type.clone(), name);
        if let Some(drive) = inner.drives.get_mut(drive_id) {
            drive
                .nodes
                .push(DriveNode::file(&id, name, None, &document_type));
        }
        inner.documents.insert(
            (drive_id.to_string(), id.clone()),
            StoredDocument {
                header,
                operations: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn push_operations(&self, batch: &ReplayBatch) -> RemoteResult<PushOutcome> {
        let mut inner = self.lock();
        inner.calls.pushes.push((batch.scope, batch.operations.len()));

        if let Some(limit) = inner.reject_pushes_after {
            if inner.calls.pushes.len() > limit {
                return Ok(PushOutcome::rejected("ERROR", "push rejected by store"));
            }
        }

        let key = (batch.drive_id.clone(), batch.document_id.clone());
        let doc = inner
            .documents
            .get_mut(&key)
            .ok_or_else(|| RemoteError::NotFound(format!("document {}", batch.document_id)))?;

        let mut last = doc
            .operations
            .iter()
            .filter(|op| op.scope == batch.scope)
            .map(|op| op.index)
            .last();
        for op in &batch.operations {
            if op.scope != batch.scope || last.is_some_and(|last| op.index <= last) {
                return Ok(PushOutcome::rejected(
                    "CONFLICT",
                    format!("operation {} out of order", op.index),
                ));
            }
            last = Some(op.index);
        }

        doc.operations.extend(batch.operations.iter().cloned());
        let revision = last.map_or(0, |index| index + 1);
        doc.header
            .revision
            .insert(batch.scope.as_str().to_string(), revision);
        Ok(PushOutcome::success(revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(index: u64, scope: Scope, input: Value) -> Operation {
        Operation {
            id: format!("op-{}", index),
            index,
            skip: 0,
            op_type: "SET".to_string(),
            timestamp_utc_ms: String::new(),
            hash: String::new(),
            error: None,
            input,
            scope,
        }
    }

    #[test]
    fn test_reduce_merges_per_scope() {
        let state = reduce(&[
            op(0, Scope::Global, json!({"name": "a"})),
            op(1, Scope::Global, json!({"name": "b", "size": 2})),
            op(0, Scope::Local, json!("x")),
        ]);
        assert_eq!(state, json!({"global": {"name": "b", "size": 2}, "local": {"SET": "x"}}));
    }

    #[test]
    fn test_reduce_skips_failed_operations() {
        let mut failed = op(1, Scope::Global, json!({"name": "bad"}));
        failed.error = Some("reducer error".into());
        let state = reduce(&[op(0, Scope::Global, json!({"name": "ok"})), failed]);
        assert_eq!(state["global"]["name"], "ok");
    }

    #[tokio::test]
    async fn test_push_rejects_out_of_order() {
        let store = MemoryStore::new();
        store.add_drive("drive", "Drive");
        store.register_type("demo/widget", "DemoWidget");
        let id = store
            .create_document("DemoWidget_createDocument", "drive", "W")
            .await
            .unwrap();

        let batch = |indices: &[u64]| ReplayBatch {
            drive_id: "drive".into(),
            document_id: id.clone(),
            document_type: "demo/widget".into(),
            scope: Scope::Global,
            operations: indices
                .iter()
                .map(|i| op(*i, Scope::Global, json!({})))
                .collect(),
        };

        assert_eq!(
            store.push_operations(&batch(&[0, 1])).await.unwrap(),
            PushOutcome::success(2)
        );
        let outcome = store.push_operations(&batch(&[1])).await.unwrap();
        assert!(!outcome.is_success());
        assert_eq!(store.operations("drive", &id).len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_command_fails() {
        let store = MemoryStore::new();
        store.add_drive("drive", "Drive");
        let err = store
            .create_document("Nope_createDocument", "drive", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::GraphQl(_)));
    }
}
