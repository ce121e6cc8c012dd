//! Error returned to callers of the cache.

use std::sync::Arc;

use http::StatusCode;
use thiserror::Error;

use crate::outcome::FetchError;

/// Shared error source.
///
/// Every caller collapsed onto one fetch receives a clone of the same error,
/// so sources are reference counted rather than boxed.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Error describing why a registry lookup did not produce a body.
///
/// Only [`NegativeStatus`](Self::NegativeStatus) comes from a cached entry;
/// every other variant leaves nothing behind, so asking again performs a
/// fresh fetch.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The request never produced a status line.
    #[error("registry query failed: {0}")]
    Transport(#[source] SharedError),

    /// The fetch was cancelled through its cancellation token.
    #[error("registry query cancelled")]
    Cancelled,

    /// The registry answered with a status outside the recognized table.
    #[error("registry query status: {0}")]
    UnexpectedStatus(StatusCode),

    /// The registry gave a recognized, cacheable answer that is not a
    /// success, such as `404 Not Found`.
    #[error("registry query status: {0}")]
    NegativeStatus(StatusCode),

    /// The status was accepted but the body could not be read.
    #[error("failed to read registry response body: {source}")]
    BodyRead {
        /// Status of the response.
        status: StatusCode,
        /// Underlying read error.
        #[source]
        source: SharedError,
    },
}

impl RegistryError {
    /// Returns `true` if this error describes a cached answer.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Self::NegativeStatus(_))
    }

    /// Returns `true` if the fetch was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the status code involved, if the registry answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::UnexpectedStatus(status)
            | Self::NegativeStatus(status)
            | Self::BodyRead { status, .. } => Some(*status),
            Self::Transport(_) | Self::Cancelled => None,
        }
    }
}

impl From<FetchError> for RegistryError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Transport(source) => Self::Transport(Arc::from(source)),
            FetchError::Cancelled => Self::Cancelled,
            FetchError::BodyRead { status, source } => Self::BodyRead {
                status,
                source: Arc::from(source),
            },
        }
    }
}
