//! Begin/complete logging around a unit of work

use std::cell::Cell;
use std::time::Instant;

use super::logger::Logger;

/// Logs `{name}_BEGIN` on creation and `{name}_COMPLETE` on [`complete`].
/// Dropped without completing, it logs `{name}_ABORTED` at ERROR.
///
/// [`complete`]: ObservationScope::complete
pub struct ObservationScope {
    name: String,
    fields: Vec<(String, String)>,
    started: Instant,
    completed: Cell<bool>,
}

impl ObservationScope {
    pub fn with_fields(name: &str, fields: &[(&str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);
        Self {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            started: Instant::now(),
            completed: Cell::new(false),
        }
    }

    fn field_refs<'a>(&'a self, extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(extra.iter().copied())
            .collect()
    }

    /// Log `{name}_COMPLETE` with the elapsed time and extra fields
    pub fn complete(self, extra: &[(&str, &str)]) {
        self.completed.set(true);
        let elapsed = self.started.elapsed().as_millis().to_string();
        let mut fields = self.field_refs(extra);
        fields.push(("elapsed_ms", elapsed.as_str()));
        Logger::info(&format!("{}_COMPLETE", self.name), &fields);
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed.get() {
            Logger::error(&format!("{}_ABORTED", self.name), &self.field_refs(&[]));
        }
    }
}
