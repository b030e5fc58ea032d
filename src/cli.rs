use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gotchipush")]
#[command(about = "Handshake uploader and validator", long_about = None)]
pub struct Cli {
    /// Simulate the upload without sending files
    #[arg(short, long)]
    pub dry_run: bool,
    /// Validate handshakes and upload status
    #[arg(short, long)]
    pub validate_upload: bool,
    /// Force upload even if already uploaded
    #[arg(short, long)]
    pub force: bool,
    /// Configuration file (defaults to Config.* in the working directory)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Override the handshake directory
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
    /// Override the uploaded-handshakes ledger file
    #[arg(long, value_name = "FILE")]
    pub ledger: Option<PathBuf>,
}
