use crate::engine::RunSummary;
use crate::uploader::UploadOutcome;
use std::path::Path;

/// Trait for reporting upload run progress.
///
/// CLI implements with indicatif. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_run_start(&self, _total_files: usize) {}
    fn on_file_start(&self, _path: &Path) {}
    fn on_file_complete(&self, _path: &Path, _outcome: &UploadOutcome) {}
    fn on_run_complete(&self, _summary: &RunSummary) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
