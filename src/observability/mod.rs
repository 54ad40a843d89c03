//! Observability for docpack runs
//!
//! Structured JSON-line logging with a process-wide minimum severity,
//! plus begin/complete scopes around each exported or imported document.
//!
//! ```ignore
//! use docpack::observability::Logger;
//!
//! Logger::info("DOCUMENT_SAVED", &[("document_id", "doc-1")]);
//! ```

mod logger;
mod scope;

pub use logger::{Logger, Severity};
pub use scope::ObservationScope;
