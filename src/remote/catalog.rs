//! Document type to create-command catalog
//!
//! The remote store advertises one create command per document model,
//! named `<Prefix>_createDocument` (e.g. `BudgetStatement_createDocument`).
//! A declared type such as `powerhouse/budget-statement` is matched by
//! comparing lowercase alphanumeric keys: first the whole type, then its
//! last path segment.

use std::collections::BTreeMap;

/// Suffix shared by all create commands
pub const CREATE_SUFFIX: &str = "_createDocument";

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Lookup table built once per run from the remote capability listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateCommandCatalog {
    by_key: BTreeMap<String, String>,
}

impl CreateCommandCatalog {
    /// Keep only create commands; other mutation names are ignored
    pub fn from_commands<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let by_key = commands
            .into_iter()
            .filter_map(|command| {
                let command = command.as_ref();
                let prefix = command.strip_suffix(CREATE_SUFFIX)?;
                let key = normalize(prefix);
                (!key.is_empty()).then(|| (key, command.to_string()))
            })
            .collect();
        Self { by_key }
    }

    /// Create command for a declared document type
    pub fn lookup(&self, document_type: &str) -> Option<&str> {
        if let Some(command) = self.by_key.get(&normalize(document_type)) {
            return Some(command.as_str());
        }
        let last_segment = document_type.rsplit('/').next()?;
        self.by_key.get(&normalize(last_segment)).map(String::as_str)
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.by_key.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
