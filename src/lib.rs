pub mod bio;
pub mod cli;
pub mod core;
pub mod tools;

pub use crate::core::{
    collapser::{CollapseReport, Collapser, MergeEvent, TieBreak},
    matrix::AbundanceMatrix,
    registry::SequenceRegistry,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollapseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Missing dependency: {0}")]
    DependencyMissing(String),

    #[error("Clustering failed: {0}")]
    ClusteringFailed(String),

    #[error("Inconsistent clustering output: {0}")]
    ClusteringInconsistent(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CollapseError>;

impl CollapseError {
    /// Process exit code reported for this error kind
    pub fn exit_code(&self) -> i32 {
        match self {
            CollapseError::Io(_) => 1,
            CollapseError::MalformedInput(_) | CollapseError::Config(_) => 2,
            CollapseError::DependencyMissing(_) => 3,
            CollapseError::ClusteringFailed(_) => 4,
            CollapseError::ClusteringInconsistent(_) => 5,
            CollapseError::Cancelled => 130,
        }
    }
}

impl From<csv::Error> for CollapseError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(e) => CollapseError::Io(e),
            kind => CollapseError::MalformedInput(format!("{:?}", kind)),
        }
    }
}

impl From<toml::de::Error> for CollapseError {
    fn from(err: toml::de::Error) -> Self {
        CollapseError::Config(format!("Failed to parse config: {}", err))
    }
}

impl From<toml::ser::Error> for CollapseError {
    fn from(err: toml::ser::Error) -> Self {
        CollapseError::Config(format!("Failed to serialize config: {}", err))
    }
}

impl From<serde_json::Error> for CollapseError {
    fn from(err: serde_json::Error) -> Self {
        CollapseError::Io(err.into())
    }
}
