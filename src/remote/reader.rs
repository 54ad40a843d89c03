//! Paginated document fetch
//!
//! The first request returns header, state, and the first page of the
//! operation log. Further pages are requested while the latest page came
//! back exactly full, with a fixed delay before every follow-up request.

use std::time::Duration;

use tokio::time::sleep;

use crate::document::FetchedDocument;

use super::errors::RemoteResult;
use super::store::{DocumentPage, PageRequest, RemoteStore};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(300);

/// Pagination and pacing for document fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub page_size: usize,
    pub request_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }
}

/// Fetch header, state, and the complete operation log of one document
pub async fn fetch_document<S: RemoteStore>(
    store: &S,
    drive_id: &str,
    document_id: &str,
    options: &FetchOptions,
) -> RemoteResult<FetchedDocument> {
    let page_size = options.page_size.max(1);

    let DocumentPage {
        header,
        state,
        mut operations,
    } = store
        .document_page(
            drive_id,
            document_id,
            PageRequest {
                skip: 0,
                first: page_size,
            },
        )
        .await?;

    let mut last_page = operations.len();
    while last_page == page_size {
        sleep(options.request_delay).await;
        let page = store
            .document_page(
                drive_id,
                document_id,
                PageRequest {
                    skip: operations.len(),
                    first: page_size,
                },
            )
            .await?;
        last_page = page.operations.len();
        operations.extend(page.operations);
    }

    Ok(FetchedDocument {
        header,
        state,
        operations,
    })
}
