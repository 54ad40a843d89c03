//! Document model shared by export and import
//!
//! - [`DocumentHeader`]: identity, type, revisions, metadata
//! - [`Operation`]: one entry of the append-only log, remote shape
//! - [`ChainedOperation`]: the same entry in container shape
//! - [`StateEntry`]: wrapper for initial and current state snapshots

mod header;
mod operation;

pub use header::{DocumentHeader, StateEntry};
pub use operation::{Action, ChainedOperation, IndexViolation, Operation, OperationLog, Scope};

use serde_json::Value;

/// Everything fetched for one remote document
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub header: DocumentHeader,
    pub state: Value,
    pub operations: Vec<Operation>,
}
