//! State comparison
//!
//! States are compared structurally: object key order never matters.
//! Differences are reported per top-level key, capped, with a count of
//! the keys left unreported.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

use crate::remote::{RemoteResult, RemoteStore};

/// Default cap on reported differing keys
pub const DEFAULT_MAX_REPORTED_DIFFS: usize = 5;

/// Key reported when the states are not both objects
pub const ROOT_KEY: &str = "<root>";

/// Outcome of comparing two states
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDiff {
    /// Differing top-level keys, sorted, at most the reporting cap
    pub differing_keys: Vec<String>,
    /// Differing keys beyond the cap
    pub remaining: usize,
}

impl StateDiff {
    pub fn is_match(&self) -> bool {
        self.differing_keys.is_empty() && self.remaining == 0
    }

    pub fn total(&self) -> usize {
        self.differing_keys.len() + self.remaining
    }
}

impl fmt::Display for StateDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_match() {
            return write!(f, "states match");
        }
        write!(f, "{}", self.differing_keys.join(", "))?;
        if self.remaining > 0 {
            write!(f, " (+{} more)", self.remaining)?;
        }
        Ok(())
    }
}

/// Compare `expected` against `actual`, key by key at the top level
pub fn diff_states(expected: &Value, actual: &Value, max_reported: usize) -> StateDiff {
    let differing: Vec<String> = match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => expected
            .keys()
            .chain(actual.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|key| expected.get(*key) != actual.get(*key))
            .cloned()
            .collect(),
        _ if expected == actual => Vec::new(),
        _ => vec![ROOT_KEY.to_string()],
    };

    let remaining = differing.len().saturating_sub(max_reported);
    StateDiff {
        differing_keys: differing.into_iter().take(max_reported).collect(),
        remaining,
    }
}

/// Fetch a document's remote state and compare it with the recorded one
pub async fn verify_remote_state<S: RemoteStore>(
    store: &S,
    drive_id: &str,
    document_id: &str,
    expected: &Value,
    max_reported: usize,
) -> RemoteResult<StateDiff> {
    let actual = store.document_state(drive_id, document_id).await?;
    Ok(diff_states(expected, &actual, max_reported))
}
