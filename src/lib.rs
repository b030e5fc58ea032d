pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod ledger;
pub mod progress;
pub mod scanner;
pub mod uploader;
pub mod validator;

pub use config::AppConfig;
pub use engine::{RunOptions, RunSummary, UploadEngine};
pub use error::Error;
pub use hasher::ContentDigest;
pub use ledger::UploadLedger;
pub use progress::{ProgressReporter, SilentReporter};
pub use uploader::{UploadOutcome, Uploader};
pub use validator::InvalidCapture;
