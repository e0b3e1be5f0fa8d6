use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Fatal configuration error: {0}")]
    FatalConfig(String),

    #[error("Report error: {0}")]
    Report(#[from] csv::Error),

    #[error("{0}")]
    Other(String),
}

/// Per-file failure. Recorded in the run report, never propagated past the
/// file boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    #[error("unsupported file type")]
    UnsupportedType,

    #[error("extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("destination already exists: {}", .0.display())]
    CollisionFailure(PathBuf),

    #[error("io failure: {0}")]
    IoFailure(String),
}

impl FileError {
    pub fn kind(&self) -> &'static str {
        match self {
            FileError::UnsupportedType => "unsupported-type",
            FileError::ExtractionFailure(_) => "extraction-failure",
            FileError::CollisionFailure(_) => "collision-failure",
            FileError::IoFailure(_) => "io-failure",
        }
    }
}
