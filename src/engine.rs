use crate::config::AppConfig;
use crate::error::Error;
use crate::hasher::{self, ContentDigest};
use crate::ledger::UploadLedger;
use crate::progress::ProgressReporter;
use crate::scanner;
use crate::uploader::{UploadOutcome, Uploader};
use crate::validator;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Run the full decision pipeline but never touch the network.
    pub dry_run: bool,
    /// Ignore the ledger and re-validate/re-upload everything.
    pub force: bool,
    /// Report successful validations at info level.
    pub validate_upload: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub scanned: usize,
    pub uploaded: usize,
    pub already_submitted: usize,
    pub skipped: usize,
    pub invalid: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl RunSummary {
    fn record(&mut self, outcome: &UploadOutcome) {
        match outcome {
            UploadOutcome::Uploaded => self.uploaded += 1,
            UploadOutcome::AlreadySubmitted => self.already_submitted += 1,
            UploadOutcome::Skipped(_) => self.skipped += 1,
            UploadOutcome::Invalid(_) => self.invalid += 1,
            UploadOutcome::TransportFailed(_) => self.failed += 1,
        }
    }
}

pub struct UploadEngine {
    config: AppConfig,
    options: RunOptions,
}

impl UploadEngine {
    pub fn new(config: AppConfig, options: RunOptions) -> Self {
        Self { config, options }
    }

    /// Scan, dedupe, validate and upload every capture in the handshake directory:
    /// 1. Precondition checks (API key, directory). Failures abort before any file is read
    /// 2. Per file: hash → ledger check → validate → upload → record
    /// 3. Persist the ledger once
    ///
    /// Per-file failures only affect that file's outcome.
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<RunSummary, Error> {
        self.config.check_preconditions()?;
        let start = Instant::now();

        let uploader = Uploader::new(&self.config, self.options.dry_run)?;
        let mut ledger = UploadLedger::load(&self.config.ledger_path);
        debug!(
            "{} digests already recorded in {}",
            ledger.len(),
            ledger.path().display()
        );

        let captures =
            scanner::list_captures(&self.config.handshake_dir, &self.config.capture_pattern)?;

        let mut summary = RunSummary {
            scanned: captures.len(),
            ..RunSummary::default()
        };

        if captures.is_empty() {
            info!("No handshake files found in the directory.");
            summary.duration = start.elapsed();
            return Ok(summary);
        }

        info!(
            "Processing {} handshake files from {}",
            captures.len(),
            self.config.handshake_dir.display()
        );
        reporter.on_run_start(captures.len());

        self.process_all(&captures, &mut ledger, &uploader, reporter, &mut summary);

        ledger.save()?;
        summary.duration = start.elapsed();
        reporter.on_run_complete(&summary);
        info!("Upload process completed.");

        Ok(summary)
    }

    /// Per-file failures only change that file's outcome; siblings always run.
    fn process_all(
        &self,
        captures: &[PathBuf],
        ledger: &mut UploadLedger,
        uploader: &Uploader,
        reporter: &dyn ProgressReporter,
        summary: &mut RunSummary,
    ) {
        for path in captures {
            reporter.on_file_start(path);
            let (outcome, digest) = self.process_file(path, ledger, uploader);
            if outcome.is_recorded() {
                if let Some(digest) = digest {
                    ledger.insert(digest);
                }
            }
            summary.record(&outcome);
            reporter.on_file_complete(path, &outcome);
        }
    }

    fn process_file(
        &self,
        path: &Path,
        ledger: &UploadLedger,
        uploader: &Uploader,
    ) -> (UploadOutcome, Option<ContentDigest>) {
        let digest = match hasher::digest_file(path) {
            Ok(digest) => digest,
            Err(e) => {
                error!("Error hashing file '{}': {}", path.display(), e);
                return (UploadOutcome::Skipped(format!("unreadable: {}", e)), None);
            }
        };

        if ledger.contains(&digest) && !self.options.force {
            info!("Skipping already uploaded file: {}", path.display());
            return (
                UploadOutcome::Skipped("already uploaded".to_string()),
                Some(digest),
            );
        }

        if let Err(reason) = validator::validate(path) {
            warn!(
                "Invalid handshake file (skipped): {}: {}",
                path.display(),
                reason
            );
            return (UploadOutcome::Invalid(reason), Some(digest));
        }

        if self.options.validate_upload {
            info!("Validated handshake: {}", path.display());
        } else {
            debug!("Validated handshake: {}", path.display());
        }

        (uploader.upload(path), Some(digest))
    }
}
