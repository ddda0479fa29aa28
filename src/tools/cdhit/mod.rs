//! cd-hit-est integration

mod parser;

pub use parser::{parse_clstr, ClstrMember, Membership};

use crate::bio::fasta::write_fasta;
use crate::core::{clusters::ClusterMap, config::ClusteringConfig, registry::SequenceRegistry};
use crate::tools::traits::Clusterer;
use crate::{CollapseError, Result};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const INSTALL_HINT: &str = "cd-hit (https://github.com/weizhongli/cdhit) does not seem to be installed. \
     Install it and make `cd-hit-est` accessible in your PATH, or point \
     --cdhit / ASV_COLLAPSE_CDHIT at the executable.";

/// Interval between checks on the running process
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// cd-hit-est throws away sequences up to this length (its `-l` default)
const THROW_AWAY_LENGTH: usize = 10;

/// Lines of tool output quoted in failure messages
const OUTPUT_TAIL_LINES: usize = 20;

/// Exact-identity clustering through cd-hit-est
pub struct CdHitClusterer {
    binary_path: PathBuf,
    config: ClusteringConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl CdHitClusterer {
    /// Resolve the configured binary and create a clusterer for it
    ///
    /// Fails with `DependencyMissing` when the binary cannot be found or is
    /// not executable.
    pub fn new(config: &ClusteringConfig) -> Result<Self> {
        let binary_path = which::which(&config.binary).map_err(|e| {
            CollapseError::DependencyMissing(format!("`{}`: {}. {}", config.binary, e, INSTALL_HINT))
        })?;
        debug!("Using {} at {:?}", config.binary, binary_path);

        Ok(Self {
            binary_path,
            config: config.clone(),
            cancel: None,
        })
    }

    /// Abort the tool when `flag` is raised
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Command line for a 100% identity, full-length, single-strand run
    fn build_command(&self, input: &Path, output_prefix: &Path) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output_prefix)
            .arg("-c")
            .arg("1.0")
            .arg("-s")
            .arg(self.config.length_cutoff.to_string())
            .arg("-G")
            .arg("1")
            .arg("-d")
            .arg("0")
            .arg("-g")
            .arg("1")
            .arg("-r")
            .arg("0")
            .arg("-T")
            .arg(self.config.threads.to_string())
            .arg("-M")
            .arg(self.config.memory_mb.to_string());
        cmd
    }

    /// Wait for the child, honouring the timeout and the cancel flag
    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let timeout = self.config.timeout();
        let start = Instant::now();

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if self.is_cancelled() {
                        return Err(CollapseError::Cancelled);
                    }
                    return Ok(status);
                }
                Ok(None) => {
                    if self.is_cancelled() {
                        warn!("Interrupted, stopping {} (PID {})", self.name(), child.id());
                        child.kill().ok();
                        child.wait().ok();
                        return Err(CollapseError::Cancelled);
                    }
                    if let Some(limit) = timeout {
                        if start.elapsed() > limit {
                            child.kill().ok();
                            child.wait().ok();
                            return Err(CollapseError::ClusteringFailed(format!(
                                "{} timed out after {} seconds",
                                self.name(),
                                limit.as_secs()
                            )));
                        }
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(CollapseError::ClusteringFailed(format!(
                        "failed to wait for {}: {}",
                        self.name(),
                        e
                    )));
                }
            }
        }
    }

    /// Run cd-hit-est inside `workdir` and parse its report
    fn run_in(&self, workdir: &Path, registry: &SequenceRegistry) -> Result<ClusterMap> {
        let input = workdir.join("variants.fna");
        let output_prefix = workdir.join("clusters");
        let stdout_path = workdir.join("cd-hit.stdout");
        let stderr_path = workdir.join("cd-hit.stderr");

        let written = write_fasta(&input, &registry.to_records())?;
        debug!("Wrote {} variants to {:?}", written, input);

        let mut cmd = self.build_command(&input, &output_prefix);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(File::create(&stdout_path)?))
            .stderr(Stdio::from(File::create(&stderr_path)?));
        debug!("Running {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| {
            CollapseError::ClusteringFailed(format!("failed to start {}: {}", self.name(), e))
        })?;
        let status = self.wait(&mut child)?;

        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "none (killed by signal)".to_string());
            let mut tail = output_tail(&stderr_path);
            if tail.is_empty() {
                tail = output_tail(&stdout_path);
            }
            return Err(CollapseError::ClusteringFailed(format!(
                "{} exited with code {}. Is your input ASV table in the expected format?\n{}",
                self.name(),
                code,
                tail
            )));
        }

        let report_path = workdir.join("clusters.clstr");
        let report = File::open(&report_path).map_err(|e| {
            CollapseError::ClusteringFailed(format!(
                "{} did not produce a cluster report at {:?}: {}",
                self.name(),
                report_path,
                e
            ))
        })?;
        let raw = parse_clstr(BufReader::new(report))?;

        explain_dropped_sequences(resolve_ids(raw, registry), registry)
    }
}

impl Clusterer for CdHitClusterer {
    fn cluster(&self, registry: &SequenceRegistry) -> Result<ClusterMap> {
        let workdir = tempfile::Builder::new().prefix("asv-collapse-").tempdir()?;
        info!(
            "Running `{}` to cluster {} ASVs at 100% sequence identity...",
            self.name(),
            registry.len()
        );

        let result = self.run_in(workdir.path(), registry);

        if self.config.keep_workdir {
            let kept = workdir.keep();
            info!("Clustering files kept in {:?}", kept);
        }
        result
    }

    fn verify_installation(&self) -> Result<()> {
        let metadata = fs::metadata(&self.binary_path)?;
        if !metadata.is_file() {
            return Err(CollapseError::DependencyMissing(format!(
                "{:?} is not a file. {}",
                self.binary_path, INSTALL_HINT
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.config.binary
    }
}

/// Map identifiers printed by cd-hit back to registered ids
///
/// cd-hit shortens long names unless told otherwise; a truncated id that
/// matches exactly one registered id is restored. Anything else is kept as
/// printed for the partition check to report.
fn resolve_ids(raw: ClusterMap, registry: &SequenceRegistry) -> ClusterMap {
    raw.iter()
        .map(|(cluster, members)| {
            let members = members
                .iter()
                .map(|id| {
                    if registry.contains_id(id) {
                        id.clone()
                    } else if let Some(full) = registry.resolve_prefix(id) {
                        debug!("Restored truncated id {} -> {}", id, full);
                        full.to_string()
                    } else {
                        id.clone()
                    }
                })
                .collect();
            (cluster.to_string(), members)
        })
        .collect()
}

/// Point at very short variants when cd-hit-est left some out
///
/// cd-hit-est silently skips sequences of `THROW_AWAY_LENGTH` nt or fewer,
/// which otherwise surfaces as a bare list of missing ids.
fn explain_dropped_sequences(clusters: ClusterMap, registry: &SequenceRegistry) -> Result<ClusterMap> {
    match clusters.verify_partition(registry) {
        Err(CollapseError::ClusteringInconsistent(msg)) => {
            let short = registry
                .iter()
                .filter(|(_, seq)| seq.len() <= THROW_AWAY_LENGTH)
                .count();
            if short == 0 {
                return Err(CollapseError::ClusteringInconsistent(msg));
            }
            Err(CollapseError::ClusteringInconsistent(format!(
                "{}; {} ASVs are {} nt or shorter, which cd-hit-est discards",
                msg, short, THROW_AWAY_LENGTH
            )))
        }
        Err(other) => Err(other),
        Ok(()) => Ok(clusters),
    }
}

/// Last lines of a captured output file
fn output_tail(path: &Path) -> String {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return String::new(),
    };
    let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[start..].join("\n")
}
