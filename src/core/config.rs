use crate::core::collapser::TieBreak;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub clustering: ClusteringConfig,
    pub collapse: CollapseConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Clustering executable, a name looked up in PATH or a path
    pub binary: String,
    /// Worker threads handed to the tool (0 = all cores)
    pub threads: usize,
    /// Memory limit in MB handed to the tool (0 = unlimited)
    pub memory_mb: usize,
    /// Seconds to wait for the tool before giving up (0 = no limit)
    pub timeout_secs: u64,
    /// Minimum length of a member relative to its representative (1.0 = same length)
    pub length_cutoff: f64,
    /// Keep the temporary clustering directory for inspection
    pub keep_workdir: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollapseConfig {
    pub tie_break: TieBreak,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Field delimiter; guessed from the file extension when unset
    pub delimiter: Option<char>,
    /// Optional JSON report of the merges performed
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file written alongside stderr, truncated at start
    pub log_file: Option<PathBuf>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            binary: "cd-hit-est".to_string(),
            threads: 0,
            memory_mb: 0,
            timeout_secs: 3600,
            length_cutoff: 1.0,
            keep_workdir: false,
        }
    }
}

impl ClusteringConfig {
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Config {
    /// Reject values the clustering tool would misinterpret
    pub fn validate(&self) -> Result<(), crate::CollapseError> {
        if self.clustering.binary.trim().is_empty() {
            return Err(crate::CollapseError::Config(
                "clustering.binary must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.clustering.length_cutoff) {
            return Err(crate::CollapseError::Config(format!(
                "clustering.length_cutoff must be within 0.0-1.0, got {}",
                self.clustering.length_cutoff
            )));
        }
        if let Some(d) = self.output.delimiter {
            if !d.is_ascii() || d == '"' || d == '\n' || d == '\r' {
                return Err(crate::CollapseError::Config(format!(
                    "output.delimiter must be a single ASCII separator, got {:?}",
                    d
                )));
            }
        }
        Ok(())
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, crate::CollapseError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), crate::CollapseError> {
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
