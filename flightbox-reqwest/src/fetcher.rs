//! Fetcher issuing registry requests through reqwest.

use std::fmt;

use async_trait::async_trait;
use flightbox::FetchConfig;
use flightbox_core::{CacheKey, CancellationToken, FetchError, FetchResult, Fetcher, Outcome};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use tracing::debug;

use crate::error::ClientError;

/// [`Fetcher`] that GETs the key as a URL.
///
/// Any status the server answers with is returned as an [`Outcome`];
/// deciding what is cacheable is left to the cache's policy. Failing to send
/// the request is a transport error, failing to read the body after the
/// status arrived is a body-read error.
///
/// The request, including the body read, is abandoned as soon as the
/// cancellation token fires.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: ClientWithMiddleware,
}

impl fmt::Debug for ReqwestFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestFetcher").finish_non_exhaustive()
    }
}

impl ReqwestFetcher {
    /// Wraps a plain reqwest client.
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_middleware(ClientBuilder::new(client).build())
    }

    /// Wraps a client with a middleware stack.
    pub fn with_middleware(client: ClientWithMiddleware) -> Self {
        Self { client }
    }

    /// Builds a reqwest client from fetch settings.
    pub fn from_config(config: &FetchConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        Ok(Self::new(builder.build()?))
    }

    async fn execute(&self, url: &str) -> FetchResult {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::transport)?;

        let status = response.status();
        debug!(url, %status, "Registry responded");

        let body = response
            .bytes()
            .await
            .map_err(|error| FetchError::body_read(status, error))?;
        Ok(Outcome::new(status, body))
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl Fetcher<CacheKey> for ReqwestFetcher {
    async fn fetch(&self, key: &CacheKey, cancel: CancellationToken) -> FetchResult {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url = key.as_str(), "Registry request cancelled");
                Err(FetchError::Cancelled)
            }
            result = self.execute(key.as_str()) => result,
        }
    }
}
