//! Deferred load-failure accumulation.
//!
//! Candidate loads are expected operational failures, not programmer errors:
//! they are recorded here and reported once per grading container instead of
//! crashing the session. The log is owned by the session and cleared only by
//! an explicit reset, because several independent containers in one session
//! must all observe failures that occurred before any of them ran.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::GraderError;

/// A single failed candidate load, kept for deferred reporting.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub filename: String,
    pub error: GraderError,
    /// If true, the file appears to be missing.
    /// If false, the load failed for another reason.
    pub missing: bool,
}

impl LoadFailure {
    pub fn new(filename: impl Into<String>, error: GraderError, missing: bool) -> Self {
        Self {
            filename: filename.into(),
            error,
            missing,
        }
    }

    /// One-line rendering of the underlying error. Reports print exactly
    /// this line, never the full chain.
    pub fn summary(&self) -> String {
        self.error.to_string()
    }

    fn key(&self) -> (&str, bool, String) {
        (&self.filename, self.missing, self.summary())
    }
}

impl PartialEq for LoadFailure {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for LoadFailure {}

impl PartialOrd for LoadFailure {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LoadFailure {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Session-owned accumulating set of load failures.
#[derive(Debug, Default)]
pub struct FailureLog {
    failures: BTreeSet<LoadFailure>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. Duplicate entries collapse under set semantics.
    pub fn record(&mut self, failure: LoadFailure) {
        self.failures.insert(failure);
    }

    /// The current failures, in deterministic order, without mutating the
    /// log.
    pub fn snapshot(&self) -> Vec<LoadFailure> {
        self.failures.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Explicit reset; the only way entries leave the log.
    pub fn reset(&mut self) {
        self.failures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{unspanned, ErrorKind, ErrorReporting, ReportingContext};

    fn not_found(module: &str) -> GraderError {
        ReportingContext::internal("load").report(
            ErrorKind::ModuleNotFound {
                module: module.to_string(),
            },
            unspanned(),
        )
    }

    #[test]
    fn duplicate_failures_collapse() {
        let mut log = FailureLog::new();
        log.record(LoadFailure::new("fib.gr", not_found("fib"), true));
        log.record(LoadFailure::new("fib.gr", not_found("fib"), true));
        log.record(LoadFailure::new("sort.gr", not_found("sort"), true));

        assert_eq!(log.len(), 2);
    }

    #[test]
    fn snapshot_does_not_drain() {
        let mut log = FailureLog::new();
        log.record(LoadFailure::new("fib.gr", not_found("fib"), true));

        assert_eq!(log.snapshot().len(), 1);
        assert_eq!(log.snapshot().len(), 1);

        log.reset();
        assert!(log.is_empty());
    }
}
