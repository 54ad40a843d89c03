//! Operation replay
//!
//! Replays a container's log against a remote document: the global
//! scope first, then local, each in index order, in fixed-size batches
//! with a pause between consecutive pushes. The first rejected batch
//! stops the replay.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::sleep;

use crate::document::{Operation, OperationLog, Scope};
use crate::observability::Logger;
use crate::remote::{RemoteStore, ReplayBatch};

use super::errors::{ContainerError, ContainerResult};

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

/// Target of a replay
#[derive(Debug, Clone, Copy)]
pub struct ReplayTarget<'a> {
    pub drive_id: &'a str,
    pub document_id: &'a str,
    pub document_type: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub pushed: usize,
    pub batches: usize,
    /// Last revision the store reported per scope
    pub revisions: BTreeMap<Scope, u64>,
}

/// Split the log into push order: scope by scope, `batch_size` at a time
pub fn plan_batches(log: &OperationLog, batch_size: usize) -> Vec<(Scope, Vec<Operation>)> {
    let batch_size = batch_size.max(1);
    Scope::ALL
        .iter()
        .flat_map(|scope| {
            log.for_scope(*scope)
                .chunks(batch_size)
                .map(move |chunk| (*scope, chunk.iter().map(Operation::from).collect()))
        })
        .collect()
}

/// Push the whole log to `target`
pub async fn replay<S: RemoteStore>(
    store: &S,
    target: ReplayTarget<'_>,
    log: &OperationLog,
    options: &ReplayOptions,
) -> ContainerResult<ReplayReport> {
    let mut report = ReplayReport::default();

    for (number, (scope, operations)) in plan_batches(log, options.batch_size)
        .into_iter()
        .enumerate()
    {
        if number > 0 {
            sleep(options.batch_delay).await;
        }

        let count = operations.len();
        let batch = ReplayBatch {
            drive_id: target.drive_id.to_string(),
            document_id: target.document_id.to_string(),
            document_type: target.document_type.to_string(),
            scope,
            operations,
        };
        let outcome = store.push_operations(&batch).await?;
        if !outcome.is_success() {
            return Err(ContainerError::BatchRejected {
                scope,
                batch: number + 1,
                reason: outcome.error.unwrap_or(outcome.status),
            });
        }

        let count_text = count.to_string();
        Logger::trace(
            "BATCH_PUSHED",
            &[
                ("document_id", target.document_id),
                ("scope", scope.as_str()),
                ("operations", count_text.as_str()),
            ],
        );
        report.pushed += count;
        report.batches += 1;
        if let Some(revision) = outcome.revision {
            report.revisions.insert(scope, revision);
        }
    }

    Ok(report)
}
