//! Fetch policy: deciding what a fetch result means for the cache.
//!
//! A [`FetchPolicy`] turns the raw [`FetchResult`] of one attempt into a
//! [`Decision`]:
//!
//! - [`Decision::CacheableSuccess`] - a stable, successful answer
//! - [`Decision::CacheableNegative`] - a stable answer that the resource is
//!   absent or unauthorized; remembered, but reported as an error
//! - [`Decision::NonCacheableFailure`] - anything that may be transient
//!
//! ## Status tables
//!
//! [`StatusPolicy`] is driven by an explicit [`StatusTable`] instead of inline
//! conditionals. The registry table recognizes three codes:
//!
//! ```
//! use flightbox_core::{Disposition, StatusTable};
//! use http::StatusCode;
//!
//! let table = StatusTable::registry();
//! assert_eq!(table.disposition(StatusCode::OK), Some(Disposition::Success));
//! assert_eq!(table.disposition(StatusCode::NOT_FOUND), Some(Disposition::Negative));
//! assert_eq!(table.disposition(StatusCode::UNAUTHORIZED), Some(Disposition::Negative));
//! assert_eq!(table.disposition(StatusCode::TOO_MANY_REQUESTS), None);
//! ```
//!
//! Codes outside the table are never cached: rate limiting or a server error
//! must not poison the cache.

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;

use crate::error::RegistryError;
use crate::outcome::{FetchError, FetchResult, Outcome};

/// How a recognized status code is reported once cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Disposition {
    /// The answer is handed back to callers as a body.
    Success,
    /// The answer is cached but handed back as [`RegistryError::NegativeStatus`].
    Negative,
}

/// A cached answer: the outcome plus how callers should see it.
///
/// Verdicts are immutable. Once stored for a key they are served as-is for
/// the lifetime of the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    outcome: Outcome,
    disposition: Disposition,
}

impl Verdict {
    /// Creates a verdict.
    pub fn new(outcome: Outcome, disposition: Disposition) -> Self {
        Self {
            outcome,
            disposition,
        }
    }

    /// Returns the cached outcome.
    #[inline]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Returns the disposition of the cached outcome.
    #[inline]
    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// Returns `true` for a successful answer.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.disposition == Disposition::Success
    }

    /// Returns the body of a successful answer, or the negative status as an
    /// error.
    pub fn into_body(self) -> Result<Bytes, RegistryError> {
        match self.disposition {
            Disposition::Success => Ok(self.outcome.into_body()),
            Disposition::Negative => Err(RegistryError::NegativeStatus(self.outcome.status())),
        }
    }
}

/// Classification of one fetch attempt.
#[derive(Debug)]
pub enum Decision {
    /// Store and return the body.
    CacheableSuccess(Outcome),
    /// Store, but report the status as an error.
    CacheableNegative(Outcome),
    /// Store nothing, report the error.
    NonCacheableFailure(RegistryError),
}

impl Decision {
    /// Returns `true` if the cache should keep the result.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, Decision::NonCacheableFailure(_))
    }

    /// Converts the decision into what the cache stores and shares.
    pub fn into_verdict(self) -> Result<Verdict, RegistryError> {
        match self {
            Decision::CacheableSuccess(outcome) => Ok(Verdict::new(outcome, Disposition::Success)),
            Decision::CacheableNegative(outcome) => {
                Ok(Verdict::new(outcome, Disposition::Negative))
            }
            Decision::NonCacheableFailure(error) => Err(error),
        }
    }
}

/// Decides whether a fetch result is cacheable.
///
/// Implementations must be pure: the same input always yields the same
/// decision, and classification never performs I/O.
pub trait FetchPolicy: Send + Sync {
    /// Classifies the result of one fetch attempt.
    fn classify(&self, result: FetchResult) -> Decision;
}

impl<T> FetchPolicy for Arc<T>
where
    T: FetchPolicy + ?Sized,
{
    fn classify(&self, result: FetchResult) -> Decision {
        self.as_ref().classify(result)
    }
}

/// Explicit table of recognized status codes.
///
/// Build one in code, or get [`StatusTable::registry`] for the standard
/// package-registry answers.
///
/// ```
/// use flightbox_core::{Disposition, StatusTable};
/// use http::StatusCode;
///
/// let table = StatusTable::new()
///     .success(StatusCode::OK)
///     .success(StatusCode::NOT_MODIFIED)
///     .negative(StatusCode::GONE);
/// assert_eq!(table.disposition(StatusCode::NOT_MODIFIED), Some(Disposition::Success));
/// assert_eq!(table.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTable {
    entries: Vec<(StatusCode, Disposition)>,
}

impl StatusTable {
    /// Creates an empty table. Nothing is cacheable until codes are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// `200 OK` as success, `404 Not Found` and `401 Unauthorized` as
    /// negative answers.
    pub fn registry() -> Self {
        Self::new()
            .success(StatusCode::OK)
            .negative(StatusCode::NOT_FOUND)
            .negative(StatusCode::UNAUTHORIZED)
    }

    /// Adds (or reclassifies) a code as a success.
    pub fn success(self, status: StatusCode) -> Self {
        self.with(status, Disposition::Success)
    }

    /// Adds (or reclassifies) a code as a cacheable negative answer.
    pub fn negative(self, status: StatusCode) -> Self {
        self.with(status, Disposition::Negative)
    }

    /// Adds a code with an explicit disposition. A later entry for the same
    /// code replaces the earlier one.
    pub fn with(mut self, status: StatusCode, disposition: Disposition) -> Self {
        match self.entries.iter_mut().find(|(code, _)| *code == status) {
            Some(entry) => entry.1 = disposition,
            None => self.entries.push((status, disposition)),
        }
        self
    }

    /// Looks up a status code.
    pub fn disposition(&self, status: StatusCode) -> Option<Disposition> {
        self.entries
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, disposition)| *disposition)
    }

    /// Iterates over the recognized codes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (StatusCode, Disposition)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of recognized codes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no code is recognized.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(StatusCode, Disposition)> for StatusTable {
    fn from_iter<I: IntoIterator<Item = (StatusCode, Disposition)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(StatusTable::new(), |table, (status, disposition)| {
                table.with(status, disposition)
            })
    }
}

/// Status-code allowlist policy.
///
/// - recognized success code: [`Decision::CacheableSuccess`]
/// - recognized negative code: [`Decision::CacheableNegative`]
/// - any other code: [`RegistryError::UnexpectedStatus`], not cached
/// - transport failure or cancellation: not cached
/// - body-read failure: not cached; if the status itself was unrecognized
///   the status is reported instead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    table: StatusTable,
}

impl StatusPolicy {
    /// Creates a policy over the given table.
    pub fn new(table: StatusTable) -> Self {
        Self { table }
    }

    /// Policy over [`StatusTable::registry`].
    pub fn registry() -> Self {
        Self::new(StatusTable::registry())
    }

    /// Returns the underlying table.
    pub fn table(&self) -> &StatusTable {
        &self.table
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::registry()
    }
}

impl FetchPolicy for StatusPolicy {
    fn classify(&self, result: FetchResult) -> Decision {
        match result {
            Ok(outcome) => match self.table.disposition(outcome.status()) {
                Some(Disposition::Success) => Decision::CacheableSuccess(outcome),
                Some(Disposition::Negative) => Decision::CacheableNegative(outcome),
                None => {
                    Decision::NonCacheableFailure(RegistryError::UnexpectedStatus(outcome.status()))
                }
            },
            Err(FetchError::BodyRead { status, .. }) if self.table.disposition(status).is_none() => {
                Decision::NonCacheableFailure(RegistryError::UnexpectedStatus(status))
            }
            Err(error) => Decision::NonCacheableFailure(error.into()),
        }
    }
}
