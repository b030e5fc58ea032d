mod cli;
mod logging;
mod reporter;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use colored::*;
use dotenv::dotenv;
use gotchipush::{RunOptions, UploadEngine};
use reporter::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let args = Cli::parse();

    let _guard = logging::init_logger(&logging::LogSettings::from_env());

    // Fatal preconditions are logged; the process still exits cleanly
    if let Err(err) = run(&args) {
        error!("{:#}", err);
    }
}

fn run(args: &Cli) -> anyhow::Result<()> {
    let mut config = gotchipush::config::load_configuration(args.config.as_deref())
        .context("Error loading configuration")?;
    if let Some(dir) = &args.dir {
        config.handshake_dir = dir.clone();
    }
    if let Some(ledger) = &args.ledger {
        config.ledger_path = ledger.clone();
    }

    let options = RunOptions {
        dry_run: args.dry_run,
        force: args.force,
        validate_upload: args.validate_upload,
    };
    if options.dry_run {
        info!("{}", "Dry run: no files will be sent".yellow());
    }

    let engine = UploadEngine::new(config, options);
    let reporter = CliReporter::new();
    let summary = engine.run(&reporter)?;

    info!(
        "{} scanned in {}",
        format!("{}", summary.scanned).cyan(),
        format!("{:.2}s", summary.duration.as_secs_f64()).green(),
    );
    info!(
        "{} uploaded, {} already submitted, {} skipped",
        format!("{}", summary.uploaded).green(),
        format!("{}", summary.already_submitted).green(),
        format!("{}", summary.skipped).cyan(),
    );
    info!(
        "{} invalid, {} failed",
        format!("{}", summary.invalid).red(),
        format!("{}", summary.failed).red(),
    );

    Ok(())
}
