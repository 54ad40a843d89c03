//! Document containers
//!
//! A container is an archive with four JSON entries:
//!
//! | entry           | content                                   |
//! |-----------------|-------------------------------------------|
//! | `header`        | document header, verbatim                 |
//! | `initial-state` | `{"state": {"global": {}, "local": {}}}`  |
//! | `current-state` | `{"state": <state at export time>}`       |
//! | `operations`    | `{"global": [...], "local": [...]}`       |
//!
//! Export writes one container per document and re-reads it at once
//! ([`verify_round_trip`]). Import parses a container, recreates the
//! document remotely, replays its log in batches, and compares the
//! resulting remote state with the recorded one.

mod errors;
mod export;
mod import;
mod reader;
mod replay;
mod state;
mod verifier;
mod writer;

pub const HEADER_ENTRY: &str = "header";
pub const INITIAL_STATE_ENTRY: &str = "initial-state";
pub const CURRENT_STATE_ENTRY: &str = "current-state";
pub const OPERATIONS_ENTRY: &str = "operations";

pub use errors::{ContainerError, ContainerResult, ErrorKind};
pub use export::{export_document, ExportOptions, ExportReport};
pub use import::{import_container, ImportOptions, ImportReport};
pub use reader::{open_container, read_container, Container};
pub use replay::{
    plan_batches, replay, ReplayOptions, ReplayReport, ReplayTarget, DEFAULT_BATCH_DELAY,
    DEFAULT_BATCH_SIZE,
};
pub use state::{diff_states, verify_remote_state, StateDiff, DEFAULT_MAX_REPORTED_DIFFS, ROOT_KEY};
pub use verifier::{verify_round_trip, RoundTripReport};
pub use writer::{build_entries, cleanup_partial, encode_container, write_container};
