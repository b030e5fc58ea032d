use crate::error::Error;
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HANDSHAKE_DIR: &str = "/root/handshakes";
pub const DEFAULT_API_URL: &str = "https://wpa-sec.stanev.org";
pub const DEFAULT_LEDGER_PATH: &str = "/root/uploaded_handshakes.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CAPTURE_PATTERN: &str = "*.pcap";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub handshake_dir: PathBuf,
    pub api_url: String,
    pub api_key: String,
    pub ledger_path: PathBuf,
    pub timeout_secs: u64,
    pub capture_pattern: String,
}

/// Defaults, then `Config.*` (or `config_file`), then `GOTCHIPUSH_*` environment variables.
pub fn load_configuration(config_file: Option<&Path>) -> Result<AppConfig, Error> {
    let file_source = match config_file {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };

    let builder = Config::builder()
        .set_default("handshake_dir", DEFAULT_HANDSHAKE_DIR)?
        .set_default("api_url", DEFAULT_API_URL)?
        .set_default("api_key", "")?
        .set_default("ledger_path", DEFAULT_LEDGER_PATH)?
        .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)?
        .set_default("capture_pattern", DEFAULT_CAPTURE_PATTERN)?
        .add_source(file_source)
        .add_source(Environment::with_prefix("GOTCHIPUSH"))
        .build()?;
    Ok(builder.try_deserialize::<AppConfig>()?)
}

impl AppConfig {
    /// Fatal startup checks. Nothing on disk is touched before these pass.
    pub fn check_preconditions(&self) -> Result<(), Error> {
        if self.api_key.trim().is_empty() {
            return Err(Error::MissingApiKey);
        }
        if !self.handshake_dir.is_dir() {
            return Err(Error::MissingHandshakeDir(self.handshake_dir.clone()));
        }
        Ok(())
    }

    pub fn api_base_url(&self) -> String {
        ensure_trailing_slash(&self.api_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
