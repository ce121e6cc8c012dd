//! Cached registry client.

use std::sync::Arc;

use bytes::Bytes;
use flightbox::{Config, RegistryCache};
use flightbox_core::{CacheKey, CancellationToken};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::fetcher::ReqwestFetcher;

/// Registry client that fetches every URL at most once.
///
/// Cloning is cheap; clones share the cache and the HTTP client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    cache: RegistryCache,
    fetcher: Arc<ReqwestFetcher>,
}

impl RegistryClient {
    /// Creates a client with an empty cache and the registry status table.
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_cache(RegistryCache::default(), ReqwestFetcher::new(client))
    }

    /// Creates a client over an existing cache, for example one seeded from
    /// a snapshot or shared with another client.
    pub fn with_cache(cache: RegistryCache, fetcher: ReqwestFetcher) -> Self {
        Self {
            cache,
            fetcher: Arc::new(fetcher),
        }
    }

    /// Builds the cache and the HTTP client from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let fetcher = ReqwestFetcher::from_config(&config.fetch)?;
        let cache = config.into_cache()?;
        Ok(Self::with_cache(cache, fetcher))
    }

    /// The underlying cache.
    pub fn cache(&self) -> &RegistryCache {
        &self.cache
    }

    /// Returns the body of `url`.
    ///
    /// `cancel` aborts the request if this call is the one performing it;
    /// every caller waiting on that request then receives
    /// [`RegistryError::Cancelled`](flightbox_core::RegistryError::Cancelled).
    pub async fn get(&self, cancel: &CancellationToken, url: &str) -> Result<Bytes, ClientError> {
        let body = self
            .cache
            .get_from(CacheKey::new(url), Arc::clone(&self.fetcher), cancel.clone())
            .await?;
        Ok(body)
    }

    /// Returns the body of `url` decoded as JSON.
    ///
    /// A body that fails to decode is still cached; decoding it again will
    /// fail the same way.
    pub async fn get_json<T>(&self, cancel: &CancellationToken, url: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let body = self.get(cancel, url).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
