pub mod output;

use crate::core::collapser::TieBreak;
use crate::core::config::{load_config, Config};
use crate::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "asv-collapse",
    version,
    about = "Collapse identical amplicon sequence variants in a sequence table",
    long_about = "Clusters the variant sequences of a DADA2-style sequence table with cd-hit-est \
                  at 100% identity and merges the abundances of every cluster into its most \
                  abundant member. Sample row totals are preserved."
)]
pub struct Cli {
    /// Input sequence table (samples x sequences; .csv, .tsv, optionally .gz)
    pub input: PathBuf,

    /// Output sequence table
    pub output: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// cd-hit-est executable, a name in PATH or a path
    #[arg(long, env = "ASV_COLLAPSE_CDHIT")]
    pub cdhit: Option<String>,

    /// Number of threads for cd-hit-est (0 = all available)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Memory limit for cd-hit-est in MB (0 = unlimited)
    #[arg(long)]
    pub memory: Option<usize>,

    /// Seconds to wait for cd-hit-est (0 = no limit)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Minimum member length relative to the representative (0.0-1.0)
    #[arg(long)]
    pub length_cutoff: Option<f64>,

    /// Representative choice among equally abundant members
    #[arg(long, value_name = "first-seen|lexicographic|input-order")]
    pub tie_break: Option<TieBreak>,

    /// Field delimiter for input and output (default: guessed from extension)
    #[arg(short, long)]
    pub delimiter: Option<char>,

    /// Write a JSON report of all merges to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Keep the temporary clustering directory
    #[arg(long)]
    pub keep_workdir: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub dump_config: bool,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Configuration file values with command line overrides applied
    pub fn effective_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };

        if let Some(binary) = &self.cdhit {
            config.clustering.binary = binary.clone();
        }
        if let Some(threads) = self.threads {
            config.clustering.threads = threads;
        }
        if let Some(memory) = self.memory {
            config.clustering.memory_mb = memory;
        }
        if let Some(timeout) = self.timeout {
            config.clustering.timeout_secs = timeout;
        }
        if let Some(cutoff) = self.length_cutoff {
            config.clustering.length_cutoff = cutoff;
        }
        if self.keep_workdir {
            config.clustering.keep_workdir = true;
        }
        if let Some(tie_break) = self.tie_break {
            config.collapse.tie_break = tie_break;
        }
        if let Some(delimiter) = self.delimiter {
            config.output.delimiter = Some(delimiter);
        }
        if let Some(report) = &self.report {
            config.output.report = Some(report.clone());
        }
        if let Some(log_file) = &self.log_file {
            config.logging.log_file = Some(log_file.clone());
        }

        config.validate()?;
        Ok(config)
    }

    /// Default log filter for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
