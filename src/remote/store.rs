//! # Remote Store Trait

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{DocumentHeader, Operation, Scope};
use crate::drive::Drive;

use super::errors::RemoteResult;

/// Window into a document's operation log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: usize,
    pub first: usize,
}

/// One answer to a per-document request
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPage {
    pub header: DocumentHeader,
    pub state: Value,
    pub operations: Vec<Operation>,
}

/// One replay request: an ordered slice of one scope's log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayBatch {
    pub drive_id: String,
    pub document_id: String,
    pub document_type: String,
    pub scope: Scope,
    pub operations: Vec<Operation>,
}

/// Remote verdict on a pushed batch
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushOutcome {
    pub status: String,
    #[serde(default)]
    pub revision: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PushOutcome {
    pub const SUCCESS: &'static str = "SUCCESS";

    pub fn success(revision: u64) -> Self {
        Self {
            status: Self::SUCCESS.to_string(),
            revision: Some(revision),
            error: None,
        }
    }

    pub fn rejected(status: &str, error: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            revision: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Self::SUCCESS
    }
}

/// Query/command surface of a remote document store.
///
/// Calls are issued one at a time; implementations need not be shareable
/// across threads.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Enumerate drive ids
    async fn list_drives(&self) -> RemoteResult<Vec<String>>;

    /// Drive details with its flat node list
    async fn drive(&self, drive_id: &str) -> RemoteResult<Drive>;

    /// Header, full state, and one page of operations
    async fn document_page(
        &self,
        drive_id: &str,
        document_id: &str,
        page: PageRequest,
    ) -> RemoteResult<DocumentPage>;

    /// Current state only
    async fn document_state(&self, drive_id: &str, document_id: &str) -> RemoteResult<Value>;

    /// Names of the supported "create document" commands
    async fn create_commands(&self) -> RemoteResult<Vec<String>>;

    /// Run a create command, returning the new document id
    async fn create_document(&self, command: &str, drive_id: &str, name: &str)
        -> RemoteResult<String>;

    /// Submit one ordered batch of operations
    async fn push_operations(&self, batch: &ReplayBatch) -> RemoteResult<PushOutcome>;
}
