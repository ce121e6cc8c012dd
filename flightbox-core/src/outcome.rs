//! Raw results of a single fetch attempt.
//!
//! A fetch either completes with an [`Outcome`] (status line plus the whole
//! body read into memory) or fails with a [`FetchError`]. Neither has been
//! judged yet: that is the job of a [`FetchPolicy`](crate::FetchPolicy).

use bytes::Bytes;
use http::StatusCode;
use thiserror::Error;

/// Boxed error type used for transport and body-read sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one fetch attempt, before classification.
pub type FetchResult = Result<Outcome, FetchError>;

/// A completed fetch: status code and full body.
///
/// Cloning is cheap, the body is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    status: StatusCode,
    body: Bytes,
}

impl Outcome {
    /// Creates an outcome from a status code and body.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns the response status code.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns a reference to the body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consumes the outcome and returns the body.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Consumes the outcome and returns status and body separately.
    pub fn into_parts(self) -> (StatusCode, Bytes) {
        (self.status, self.body)
    }
}

/// Failure reported by the fetch collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS, timeout or any other failure before a status line
    /// was received.
    #[error(transparent)]
    Transport(BoxError),

    /// The caller's cancellation token fired while the fetch was running.
    #[error("fetch cancelled")]
    Cancelled,

    /// The status line arrived but reading the body failed.
    #[error("failed to read body of {status} response: {source}")]
    BodyRead {
        /// Status of the response whose body could not be read.
        status: StatusCode,
        /// Underlying read error.
        source: BoxError,
    },
}

impl FetchError {
    /// Wraps any error as a transport failure.
    pub fn transport<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Transport(error.into())
    }

    /// Wraps any error as a body-read failure for the given status.
    pub fn body_read<E>(status: StatusCode, error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::BodyRead {
            status,
            source: error.into(),
        }
    }
}
