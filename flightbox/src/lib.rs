#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// The memoizing cache.
///
/// [`MemoCache`] stores one classified result per key and collapses
/// concurrent lookups of the same key into a single fetch.
pub mod cache;

mod concurrency;

/// YAML configuration of the status table, snapshot and fetch settings.
pub mod config;

/// Error type for configuration and snapshot loading.
pub mod error;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, this module records counters for
/// hits, misses, joins, stores and failures, and a fetch duration histogram.
pub mod metrics;

/// Read-only snapshots used to seed a cache.
pub mod snapshot;

pub use cache::{MemoCache, RegistryCache};
pub use config::{Config, FetchConfig, PolicyConfig};
pub use error::ConfigError;
pub use snapshot::{Snapshot, SnapshotEntry};

pub use flightbox_core::{
    CacheKey, CancellationToken, Decision, Disposition, FetchError, FetchPolicy, FetchResult,
    Fetcher, Outcome, RegistryError, StatusPolicy, StatusTable, Verdict,
};
