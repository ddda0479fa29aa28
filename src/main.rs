use asv_collapse::cli::{output, Cli};
use asv_collapse::core::{config::Config, Pipeline};
use asv_collapse::CollapseError;
use clap::Parser;
use colored::*;
use std::fs::File;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        let exit_code = e
            .downcast_ref::<CollapseError>()
            .map(CollapseError::exit_code)
            .unwrap_or(1);
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.effective_config()?;

    if cli.dump_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    init_logging(&cli, &config)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    let pipeline = Pipeline::new(config).with_cancel_flag(cancel);
    let report = pipeline.run(&cli.input, &cli.output)?;

    output::collapse_summary(&report, &cli.output);
    Ok(())
}

/// Stderr logging filtered by ASV_COLLAPSE_LOG, plus an optional plain log file
fn init_logging(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    // -v takes precedence over the environment
    let filter = if cli.verbose > 0 {
        EnvFilter::new(cli.log_level())
    } else {
        EnvFilter::try_from_env("ASV_COLLAPSE_LOG").unwrap_or_else(|_| EnvFilter::new(cli.log_level()))
    };

    let file_layer = match &config.logging.log_file {
        Some(path) => {
            let file = File::create(path).map_err(CollapseError::Io)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}
