//! Run summary
//!
//! Each document or file ends in exactly one [`Outcome`]. Outcomes are
//! folded into a [`RunSummary`] with [`RunSummary::absorb`]; per-drive
//! summaries are combined with [`RunSummary::merge`].

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::container::{ContainerError, ErrorKind, ImportReport, StateDiff};

/// Final state of one unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Document written and re-read
    Saved {
        document_id: String,
        path: PathBuf,
        round_trip: StateDiff,
    },
    /// Document not exported
    Skipped { subject: String, reason: String },
    /// Container recreated remotely
    Uploaded { source: PathBuf, report: ImportReport },
    Failed {
        subject: String,
        kind: ErrorKind,
        reason: String,
    },
}

impl Outcome {
    pub fn failed(subject: impl Into<String>, error: &ContainerError) -> Self {
        Outcome::Failed {
            subject: subject.into(),
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub subject: String,
    pub kind: ErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub subject: String,
    pub diff: StateDiff,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub saved: usize,
    pub skipped: usize,
    pub uploaded: usize,
    pub pushed: usize,
    /// Units whose state comparison matched
    pub verified: usize,
    pub mismatches: Vec<Mismatch>,
    pub failures: Vec<Failure>,
}

impl RunSummary {
    pub fn absorb(mut self, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Saved {
                path, round_trip, ..
            } => {
                self.saved += 1;
                self.record_diff(path.display().to_string(), Some(round_trip));
            }
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Uploaded { source, report } => {
                self.uploaded += 1;
                self.pushed += report.pushed;
                self.record_diff(source.display().to_string(), report.state);
            }
            Outcome::Failed {
                subject,
                kind,
                reason,
            } => self.failures.push(Failure {
                subject,
                kind,
                reason,
            }),
        }
        self
    }

    fn record_diff(&mut self, subject: String, diff: Option<StateDiff>) {
        match diff {
            Some(diff) if diff.is_match() => self.verified += 1,
            Some(diff) => self.mismatches.push(Mismatch { subject, diff }),
            None => {}
        }
    }

    pub fn merge(mut self, other: RunSummary) -> Self {
        self.saved += other.saved;
        self.skipped += other.skipped;
        self.uploaded += other.uploaded;
        self.pushed += other.pushed;
        self.verified += other.verified;
        self.mismatches.extend(other.mismatches);
        self.failures.extend(other.failures);
        self
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn mismatched(&self) -> usize {
        self.mismatches.len()
    }

    pub fn download_line(&self) -> String {
        format!(
            "saved {}, skipped {}, verified {}, mismatched {}, failed {}",
            self.saved,
            self.skipped,
            self.verified,
            self.mismatched(),
            self.failed()
        )
    }

    pub fn upload_line(&self) -> String {
        format!(
            "uploaded {}, pushed {}, verified {}, mismatched {}, failed {}",
            self.uploaded,
            self.pushed,
            self.verified,
            self.mismatched(),
            self.failed()
        )
    }

    /// Every failure and mismatch, one per line
    pub fn details(&self) -> String {
        let mut out = String::new();
        for failure in &self.failures {
            let _ = writeln!(
                out,
                "  FAILED [{}] {}: {}",
                failure.kind, failure.subject, failure.reason
            );
        }
        for mismatch in &self.mismatches {
            let _ = writeln!(out, "  MISMATCH {}: {}", mismatch.subject, mismatch.diff);
        }
        out
    }
}
