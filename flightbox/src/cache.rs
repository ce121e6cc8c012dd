//! The memoizing cache.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use flightbox_core::{
    CacheKey, FetchPolicy, FetchResult, Fetcher, Outcome, RegistryError, StatusPolicy, Verdict,
};
use futures::FutureExt;
use http::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, warn};

use crate::concurrency::{ConcurrencyDecision, Flight, FlightMap, Landing, Resolution};
use crate::metrics::{self, Lookup};
use crate::snapshot::Snapshot;

struct Inner<K, P> {
    slots: FlightMap<K>,
    policy: Arc<P>,
    preloaded_at: Option<DateTime<Utc>>,
}

/// Single-flight memoizing cache.
///
/// `MemoCache` maps keys to the classified result of one fetch. Concurrent
/// lookups of a key that is not stored yet collapse into a single fetch: the
/// first caller runs it, every other caller awaits the same pending result.
/// The result is stored only when the [`FetchPolicy`] says it is cacheable;
/// anything else is handed to the callers of that fetch and forgotten, so
/// the next lookup fetches again.
///
/// Stored entries are never updated, evicted or expired. The cache grows
/// with the number of distinct keys for as long as it is alive.
///
/// Cloning is cheap and every clone shares the same entries.
///
/// # Type Parameters
///
/// * `K` - Key type. [`CacheKey`] is the usual choice.
/// * `P` - Classification policy. Default: [`StatusPolicy`] over the
///   registry status table.
///
/// # Example
///
/// ```
/// use flightbox::MemoCache;
/// use flightbox_core::{CacheKey, FetchError, Outcome};
/// use http::StatusCode;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = MemoCache::<CacheKey>::default();
/// let key = CacheKey::new("https://pypi.org/pypi/requests/json");
///
/// let body = cache
///     .get(key.clone(), || async { Ok::<_, FetchError>(Outcome::new(StatusCode::OK, "{}")) })
///     .await
///     .unwrap();
/// assert_eq!(body, "{}");
///
/// // Served from the cache, the second fetch is never called.
/// let again = cache
///     .get(key, || async { Ok::<_, FetchError>(Outcome::new(StatusCode::OK, "fresh")) })
///     .await
///     .unwrap();
/// assert_eq!(again, "{}");
/// # }
/// ```
pub struct MemoCache<K, P = StatusPolicy> {
    inner: Arc<Inner<K, P>>,
}

impl<K, P> Clone for MemoCache<K, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, P> MemoCache<K, P>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    P: FetchPolicy + 'static,
{
    /// Creates an empty cache.
    pub fn new(policy: P) -> Self {
        Self::from_parts(policy, FlightMap::new(), None)
    }

    /// Creates a cache seeded from a previously taken snapshot.
    ///
    /// Each record is run through `policy` as if it had just been fetched;
    /// only records the policy would cache are loaded. The seeded entries are
    /// indistinguishable from fetched ones.
    pub fn with_snapshot(policy: P, snapshot: Snapshot<K>) -> Self {
        let slots = FlightMap::new();
        let timestamp = snapshot.timestamp;
        let mut loaded = 0usize;

        for entry in snapshot.entries {
            let Ok(status) = StatusCode::from_u16(entry.status) else {
                warn!(key = ?entry.key, status = entry.status, "Skipping snapshot record with invalid status");
                continue;
            };
            let outcome = Outcome::new(status, entry.body);
            match policy.classify(Ok(outcome)).into_verdict() {
                Ok(verdict) => {
                    if slots.seed(entry.key, verdict) {
                        loaded += 1;
                    }
                }
                Err(error) => {
                    debug!(key = ?entry.key, %error, "Snapshot record is not cacheable");
                }
            }
        }

        debug!(loaded, %timestamp, "Cache seeded from snapshot");
        Self::from_parts(policy, slots, Some(timestamp))
    }

    fn from_parts(policy: P, slots: FlightMap<K>, preloaded_at: Option<DateTime<Utc>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots,
                policy: Arc::new(policy),
                preloaded_at,
            }),
        }
    }

    /// Looks up `key`, fetching it at most once.
    ///
    /// - If a cacheable answer is stored, it is returned without fetching.
    /// - If another caller is already fetching `key`, this call waits for
    ///   that fetch and returns its result.
    /// - Otherwise `fetch` is called, its result classified and stored when
    ///   cacheable.
    ///
    /// `fetch` is only invoked by the caller that starts the fetch. Its
    /// future keeps running as long as any caller for the key is waiting on
    /// it; cancellation is expressed through the fetch itself resolving with
    /// [`FetchError::Cancelled`](flightbox_core::FetchError::Cancelled).
    ///
    /// A lookup abandoned by every caller before it resolves stays
    /// registered and counted in [`in_flight`](Self::in_flight), holding its
    /// unfinished fetch, until the key is looked up again and the fetch is
    /// driven to completion.
    ///
    /// # Errors
    ///
    /// Negative answers (such as `404 Not Found` under the registry table)
    /// are returned as [`RegistryError::NegativeStatus`] every time the key
    /// is looked up. All other errors come from a single fetch and are not
    /// remembered.
    pub async fn get<F, Fut>(&self, key: K, fetch: F) -> Result<Bytes, RegistryError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FetchResult> + Send + 'static,
    {
        self.resolve(key, fetch).await?.into_body()
    }

    /// Same as [`get`](Self::get), but returns the stored [`Verdict`] so the
    /// caller can inspect negative answers instead of receiving them as
    /// errors.
    pub async fn resolve<F, Fut>(&self, key: K, fetch: F) -> Result<Verdict, RegistryError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FetchResult> + Send + 'static,
    {
        let decision = self.inner.slots.check_or_launch(key.clone(), |landing| {
            self.launch(key.clone(), landing, fetch)
        });

        let flight = match decision {
            ConcurrencyDecision::Ready(verdict) => {
                debug!(?key, status = %verdict.outcome().status(), "Cache hit");
                metrics::record_lookup(Lookup::Hit);
                return Ok(verdict);
            }
            ConcurrencyDecision::Await(flight) => {
                debug!(?key, "Awaiting fetch in flight");
                metrics::record_lookup(Lookup::Join);
                flight
            }
            ConcurrencyDecision::Proceed(flight) => {
                debug!(?key, "Cache miss, fetching");
                metrics::record_lookup(Lookup::Miss);
                flight
            }
        };

        flight.await
    }

    /// Looks up `key` through a shared [`Fetcher`].
    ///
    /// `cancel` is handed to the fetcher only if this call starts the fetch.
    pub async fn get_from<Fe>(
        &self,
        key: K,
        fetcher: Arc<Fe>,
        cancel: CancellationToken,
    ) -> Result<Bytes, RegistryError>
    where
        Fe: Fetcher<K> + ?Sized + 'static,
    {
        let fetch_key = key.clone();
        self.get(key, move || async move { fetcher.fetch(&fetch_key, cancel).await })
            .await
    }

    /// Builds the shared future for one fetch. Not polled here: this runs
    /// under the shard lock of `key`.
    fn launch<F, Fut>(&self, key: K, landing: Landing<K>, fetch: F) -> Flight
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FetchResult> + Send + 'static,
    {
        let policy = Arc::clone(&self.inner.policy);
        let span = debug_span!("flightbox.fetch", key = ?key);

        fly(key, policy, landing, fetch)
            .instrument(span)
            .boxed()
            .shared()
    }
}

/// Drives one fetch to its resolution and settles the slot.
///
/// Arguments of an `async fn` live in the future's locals, so `landing` is
/// dropped (clearing the in-flight marker) if `fetch` panics.
async fn fly<K, P, F, Fut>(key: K, policy: Arc<P>, landing: Landing<K>, fetch: F) -> Resolution
where
    K: Eq + Hash + fmt::Debug,
    P: FetchPolicy,
    F: FnOnce() -> Fut,
    Fut: Future<Output = FetchResult>,
{
    let started = Instant::now();
    let resolution = policy.classify(fetch().await).into_verdict();
    landing.settle(&resolution);

    match &resolution {
        Ok(verdict) => {
            let status = verdict.outcome().status();
            debug!(?key, %status, disposition = ?verdict.disposition(), "Stored fetch result");
            metrics::record_fetch(true, status.as_str(), started.elapsed());
        }
        Err(error) => {
            warn!(?key, %error, "Fetch result not cacheable");
            metrics::record_fetch(false, failure_label(error), started.elapsed());
        }
    }
    resolution
}

impl<K, P> MemoCache<K, P>
where
    K: Eq + Hash + Clone,
{
    /// Returns `true` if a cacheable answer is stored for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.slots.contains_ready(key)
    }

    /// Number of stored answers.
    pub fn len(&self) -> usize {
        self.inner.slots.ready_count()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.slots.pending_count()
    }

    /// When the snapshot this cache was seeded from was taken, if any.
    pub fn preloaded_at(&self) -> Option<DateTime<Utc>> {
        self.inner.preloaded_at
    }

    /// Returns the classification policy.
    pub fn policy(&self) -> &P {
        &self.inner.policy
    }
}

impl<K> Default for MemoCache<K, StatusPolicy>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(StatusPolicy::registry())
    }
}

impl<K, P> fmt::Debug for MemoCache<K, P>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCache")
            .field("entries", &self.len())
            .field("in_flight", &self.in_flight())
            .field("preloaded_at", &self.inner.preloaded_at)
            .field("policy", &"...")
            .finish()
    }
}

/// Cache of registry responses keyed by URL.
pub type RegistryCache = MemoCache<CacheKey, StatusPolicy>;

fn failure_label(error: &RegistryError) -> &str {
    match error {
        RegistryError::Transport(_) => "transport",
        RegistryError::Cancelled => "cancelled",
        RegistryError::UnexpectedStatus(status) | RegistryError::NegativeStatus(status) => {
            status.as_str()
        }
        RegistryError::BodyRead { .. } => "body_read",
    }
}
