//! Errors raised while loading configuration and snapshots.

use std::io;
use std::path::PathBuf;

/// Error loading a [`Config`](crate::config::Config) or a
/// [`Snapshot`](crate::snapshot::Snapshot).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Configuration is not valid YAML or does not match the schema.
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_saphyr::Error),
    /// Snapshot is not valid JSON or does not match the schema.
    #[error("invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),
    /// A status code outside `100..=999`.
    #[error("invalid status code {0}")]
    InvalidStatus(u16),
    /// The same status code is listed as both success and negative.
    #[error("status code {0} is listed as both success and negative")]
    ConflictingStatus(u16),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}
