use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_FILE_PATH: &str = "./logs/gotchipush.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub log_dir: PathBuf,
    pub log_file: String,
}

impl LogSettings {
    /// `TRACING_LEVEL` and `LOG_FILE_PATH`, falling back to info and ./logs/gotchipush.log.
    pub fn from_env() -> Self {
        let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
        let log_file_path =
            env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE_PATH.to_string());
        let (log_dir, log_file) = split_log_path(&log_file_path);
        Self {
            filter,
            log_dir,
            log_file,
        }
    }
}

fn split_log_path(log_file_path: &str) -> (PathBuf, String) {
    let path = Path::new(log_file_path);
    let log_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let log_file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gotchipush.log".to_string());
    (log_dir, log_file)
}

fn build_file_appender(settings: &LogSettings) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&settings.log_file)
        .build(&settings.log_dir)
}

/// Terminal output plus a plain-text log file. Keep the guard alive for the whole run
/// or buffered file lines are lost. When the log file cannot be created, only the
/// terminal is logged to.
pub fn init_logger(settings: &LogSettings) -> Option<WorkerGuard> {
    let filter_layer =
        EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_writer, file_error) = match build_file_appender(settings) {
        Ok(appender) => (Some(tracing_appender::non_blocking(appender)), None),
        Err(e) => (None, Some(e)),
    };
    let (file_layer, guard) = match file_writer {
        Some((non_blocking, guard)) => (
            Some(fmt::layer().with_writer(non_blocking).with_ansi(false)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(file_layer)
        .with(filter_layer)
        .init();

    match file_error {
        Some(e) => warn!(
            "Could not open log file {}: {}. Logging to stdout only.",
            settings.log_dir.join(&settings.log_file).display(),
            e
        ),
        None => debug!(
            "Logging to {}",
            settings.log_dir.join(&settings.log_file).display()
        ),
    }

    guard
}
