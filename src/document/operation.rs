//! Operations and per-scope operation logs
//!
//! Operations are immutable once fetched. The `hash` field binds each
//! operation to the one before it; it is carried verbatim and never
//! recomputed here.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named partition of a document's operation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Local,
}

impl Scope {
    /// Replay order
    pub const ALL: [Scope; 2] = [Scope::Global, Scope::Local];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Local => "local",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "global" => Some(Scope::Global),
            "local" => Some(Scope::Local),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One operation as the remote store reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    pub index: u64,
    #[serde(default)]
    pub skip: u64,
    #[serde(rename = "type")]
    pub op_type: String,
    pub timestamp_utc_ms: String,
    /// Chain hash binding this operation to its predecessor
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub input: Value,
    pub scope: Scope,
}

/// The action half of a chained operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub timestamp_utc_ms: String,
    #[serde(default)]
    pub input: Value,
    pub scope: Scope,
}

/// An operation in the shape stored inside a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainedOperation {
    pub id: String,
    pub index: u64,
    #[serde(default)]
    pub skip: u64,
    #[serde(default)]
    pub hash: String,
    pub timestamp_utc_ms: String,
    #[serde(default)]
    pub error: Option<String>,
    pub action: Action,
}

impl From<&Operation> for ChainedOperation {
    fn from(op: &Operation) -> Self {
        Self {
            id: op.id.clone(),
            index: op.index,
            skip: op.skip,
            hash: op.hash.clone(),
            timestamp_utc_ms: op.timestamp_utc_ms.clone(),
            error: op.error.clone(),
            action: Action {
                id: op.id.clone(),
                action_type: op.op_type.clone(),
                timestamp_utc_ms: op.timestamp_utc_ms.clone(),
                input: op.input.clone(),
                scope: op.scope,
            },
        }
    }
}

impl From<&ChainedOperation> for Operation {
    fn from(op: &ChainedOperation) -> Self {
        Self {
            id: op.id.clone(),
            index: op.index,
            skip: op.skip,
            op_type: op.action.action_type.clone(),
            timestamp_utc_ms: op.timestamp_utc_ms.clone(),
            hash: op.hash.clone(),
            error: op.error.clone(),
            input: op.action.input.clone(),
            scope: op.action.scope,
        }
    }
}

/// Index ordering problem within one scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexViolation {
    pub scope: Scope,
    pub position: usize,
    pub previous: Option<u64>,
    pub index: u64,
    pub skip: u64,
}

impl fmt::Display for IndexViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.previous {
            Some(previous) => write!(
                f,
                "{} operation #{} has index {} (skip {}) after index {}",
                self.scope, self.position, self.index, self.skip, previous
            ),
            None => write!(
                f,
                "{} operation #{} has index {} (skip {}) at log start",
                self.scope, self.position, self.index, self.skip
            ),
        }
    }
}

/// Per-scope operation log as stored in a container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationLog {
    #[serde(default)]
    pub global: Vec<ChainedOperation>,
    #[serde(default)]
    pub local: Vec<ChainedOperation>,
}

impl OperationLog {
    /// Partition fetched operations by scope, keeping their order
    pub fn from_operations(operations: &[Operation]) -> Self {
        let mut log = Self::default();
        for op in operations {
            log.scope_mut(op.scope).push(ChainedOperation::from(op));
        }
        log
    }

    pub fn for_scope(&self, scope: Scope) -> &[ChainedOperation] {
        match scope {
            Scope::Global => &self.global,
            Scope::Local => &self.local,
        }
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut Vec<ChainedOperation> {
        match scope {
            Scope::Global => &mut self.global,
            Scope::Local => &mut self.local,
        }
    }

    pub fn len(&self) -> usize {
        self.global.len() + self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that indices increase without unexplained gaps.
    ///
    /// Each operation must come after the previous index, and any gap
    /// before it must be covered by its `skip`: with `next = previous + 1`
    /// (or 0 at the start of a scope), `index >= next` and
    /// `index - skip <= next`. A skip may reach back over operations that
    /// are still present in the log.
    pub fn verify_index_order(&self) -> Result<(), IndexViolation> {
        for scope in Scope::ALL {
            let mut previous: Option<u64> = None;
            for (position, op) in self.for_scope(scope).iter().enumerate() {
                let next = previous.map_or(0, |p| p + 1);
                let covered = op
                    .index
                    .checked_sub(op.skip)
                    .is_some_and(|base| base <= next);
                if op.index < next || !covered {
                    return Err(IndexViolation {
                        scope,
                        position,
                        previous,
                        index: op.index,
                        skip: op.skip,
                    });
                }
                previous = Some(op.index);
            }
        }
        Ok(())
    }
}
