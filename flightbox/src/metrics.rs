//! Metrics declaration and recording.

use std::time::Duration;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Lookup metrics

    /// Track number of lookups served from a stored entry.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "flightbox_cache_hit_total",
            "Total number of lookups served from a stored entry."
        );
        "flightbox_cache_hit_total"
    };
    /// Track number of lookups that started a fetch.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "flightbox_cache_miss_total",
            "Total number of lookups that started a fetch."
        );
        "flightbox_cache_miss_total"
    };
    /// Track number of lookups collapsed onto a fetch already in flight.
    pub static ref CACHE_JOIN_COUNTER: &'static str = {
        metrics::describe_counter!(
            "flightbox_cache_join_total",
            "Total number of lookups that awaited a fetch already in flight."
        );
        "flightbox_cache_join_total"
    };

    // Fetch metrics

    /// Track number of fetch results stored in the cache.
    pub static ref CACHE_STORE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "flightbox_cache_store_total",
            "Total number of fetch results stored in the cache."
        );
        "flightbox_cache_store_total"
    };
    /// Track number of fetches that ended in a non-cacheable failure.
    pub static ref FETCH_FAILURE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "flightbox_fetch_failure_total",
            "Total number of fetches that ended in a non-cacheable failure."
        );
        "flightbox_fetch_failure_total"
    };
    /// Histogram of fetch duration.
    pub static ref FETCH_DURATION: &'static str = {
        metrics::describe_histogram!(
            "flightbox_fetch_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of fetches in seconds."
        );
        "flightbox_fetch_duration_seconds"
    };
}

/// How a lookup was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Served from a stored entry.
    Hit,
    /// Started a new fetch.
    Miss,
    /// Awaited a fetch already in flight.
    Join,
}

impl Lookup {
    /// Returns the lookup kind as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::Hit => "hit",
            Lookup::Miss => "miss",
            Lookup::Join => "join",
        }
    }
}

/// Record how a lookup was served.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_lookup(lookup: Lookup) {
    let counter = match lookup {
        Lookup::Hit => *CACHE_HIT_COUNTER,
        Lookup::Miss => *CACHE_MISS_COUNTER,
        Lookup::Join => *CACHE_JOIN_COUNTER,
    };
    metrics::counter!(counter).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_lookup(_lookup: Lookup) {}

/// Record the end of a fetch.
///
/// `stored` tells whether the result went into the cache; `status` is the
/// status label (`"cancelled"`, `"transport"` and so on for failures
/// without one).
#[cfg(feature = "metrics")]
#[inline]
pub fn record_fetch(stored: bool, status: &str, duration: Duration) {
    metrics::histogram!(*FETCH_DURATION, "status" => status.to_string())
        .record(duration.as_secs_f64());
    if stored {
        metrics::counter!(*CACHE_STORE_COUNTER, "status" => status.to_string()).increment(1);
    } else {
        metrics::counter!(*FETCH_FAILURE_COUNTER, "status" => status.to_string()).increment(1);
    }
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_fetch(_stored: bool, _status: &str, _duration: Duration) {}
