//! Error types for output writers.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while writing a report, export or pcap file
#[derive(Error, Debug)]
pub enum OutputError {
    /// File could not be created or written
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on an already-open writer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl OutputError {
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OutputError::File {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, OutputError>;
