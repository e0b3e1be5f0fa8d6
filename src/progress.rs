use crate::report::{Outcome, RunReport};
use std::path::Path;

/// Trait for reporting sort progress.
///
/// The CLI implements it with indicatif; library callers can pass `SilentReporter`.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_library_index_start(&self) {}
    fn on_library_index_complete(&self, _files_indexed: usize, _duration_secs: f64) {}
    fn on_sort_start(&self, _dry_run: bool) {}
    fn on_file_processed(&self, _files_processed: usize, _path: &Path, _outcome: Outcome) {}
    fn on_sort_complete(&self, _report: &RunReport) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
