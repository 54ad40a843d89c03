//! Remote document store access
//!
//! [`RemoteStore`] is the seam between the archive pipeline and the
//! outside world. [`HttpStore`] speaks GraphQL over HTTP; [`MemoryStore`]
//! keeps everything in process.
//!
//! All remote traffic is sequential. Callers pace themselves with the
//! delays in [`FetchOptions`] and the replay options.

mod catalog;
mod errors;
mod http;
pub mod memory;
mod reader;
mod store;

pub use catalog::{CreateCommandCatalog, CREATE_SUFFIX};
pub use errors::{RemoteError, RemoteResult};
pub use http::{is_graphql_name, HttpStore};
pub use memory::MemoryStore;
pub use reader::{fetch_document, FetchOptions, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_DELAY};
pub use store::{DocumentPage, PageRequest, PushOutcome, RemoteStore, ReplayBatch};
