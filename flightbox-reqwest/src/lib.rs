#![doc = include_str!("../README.md")]

mod client;
mod error;
mod fetcher;

pub use client::RegistryClient;
pub use error::ClientError;
pub use fetcher::ReqwestFetcher;

// Re-export common types
pub use flightbox::{Config, FetchConfig, MemoCache, RegistryCache};
pub use flightbox_core::{CacheKey, CancellationToken, RegistryError};
