#![warn(missing_docs)]
//! # flightbox-core
//!
//! Core types for the Flightbox single-flight registry cache.
//!
//! This crate holds everything the cache needs to know about a fetch
//! without knowing how the fetch is performed:
//!
//! - **Identify** resources ([`CacheKey`])
//! - **Describe** raw results ([`Outcome`], [`FetchError`])
//! - **Decide** what is cacheable ([`FetchPolicy`], [`StatusPolicy`], [`StatusTable`])
//! - **Report** failures to callers ([`RegistryError`])
//! - **Perform** fetches behind a trait seam ([`Fetcher`])
//!
//! The cache itself lives in the `flightbox` crate.

pub mod error;
pub mod fetcher;
pub mod key;
pub mod outcome;
pub mod policy;

pub use error::{RegistryError, SharedError};
pub use fetcher::Fetcher;
pub use key::CacheKey;
pub use outcome::{BoxError, FetchError, FetchResult, Outcome};
pub use policy::{Decision, Disposition, FetchPolicy, StatusPolicy, StatusTable, Verdict};
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use tokio_util::sync::CancellationToken;
