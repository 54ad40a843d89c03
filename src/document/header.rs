//! Document header and state entries

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::operation::Scope;

fn default_branch() -> String {
    "main".to_string()
}

/// Identity and bookkeeping for one document.
///
/// Copied verbatim into the `header` entry of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHeader {
    pub id: String,
    pub document_type: String,
    pub name: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub created_at_utc_iso: String,
    #[serde(default)]
    pub last_modified_at_utc_iso: String,
    /// Revision counter per scope
    #[serde(default)]
    pub revision: BTreeMap<String, u64>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl DocumentHeader {
    /// Minimal header with a single global revision counter
    pub fn new(id: impl Into<String>, document_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document_type: document_type.into(),
            name: name.into(),
            branch: default_branch(),
            slug: String::new(),
            created_at_utc_iso: String::new(),
            last_modified_at_utc_iso: String::new(),
            revision: BTreeMap::new(),
            meta: Map::new(),
        }
    }

    pub fn revision_of(&self, scope: Scope) -> u64 {
        self.revision.get(scope.as_str()).copied().unwrap_or(0)
    }
}

/// Body of the `initial-state` and `current-state` entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub state: Value,
}

impl StateEntry {
    /// All-empty starting point
    pub fn initial() -> Self {
        Self {
            state: json!({ "global": {}, "local": {} }),
        }
    }

    pub fn current(state: Value) -> Self {
        Self { state }
    }
}
