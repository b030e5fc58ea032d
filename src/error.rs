use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] serde_json::Error),

    #[error("API key is not set. Please configure gotchipush with your API key.")]
    MissingApiKey,

    #[error("Handshake directory {} does not exist.", .0.display())]
    MissingHandshakeDir(PathBuf),
}
