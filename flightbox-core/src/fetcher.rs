use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::outcome::FetchResult;

/// Trait for performing the actual network fetch behind a cache miss.
/// The trait is transport-agnostic; `flightbox-reqwest` provides an HTTP
/// implementation.
///
/// Implementations should watch `cancel` and resolve with
/// [`FetchError::Cancelled`](crate::FetchError::Cancelled) once it fires, so
/// that every caller waiting on the fetch sees the cancellation.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use flightbox_core::{CacheKey, FetchResult, Fetcher, Outcome};
/// use tokio_util::sync::CancellationToken;
///
/// struct Static;
///
/// #[async_trait]
/// impl Fetcher<CacheKey> for Static {
///     async fn fetch(&self, _key: &CacheKey, _cancel: CancellationToken) -> FetchResult {
///         Ok(Outcome::new(http::StatusCode::OK, "{}"))
///     }
/// }
/// ```
#[async_trait]
pub trait Fetcher<K>: Send + Sync
where
    K: Sync,
{
    /// Fetch the resource identified by `key`.
    async fn fetch(&self, key: &K, cancel: CancellationToken) -> FetchResult;
}

#[async_trait]
impl<K, T> Fetcher<K> for Arc<T>
where
    K: Sync,
    T: Fetcher<K> + ?Sized,
{
    async fn fetch(&self, key: &K, cancel: CancellationToken) -> FetchResult {
        self.as_ref().fetch(key, cancel).await
    }
}
