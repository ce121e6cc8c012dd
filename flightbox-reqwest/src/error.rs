//! Errors returned by the registry client.

use flightbox::ConfigError;
use flightbox_core::RegistryError;

/// Error returned by [`RegistryClient`](crate::RegistryClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The lookup failed or the registry answered negatively.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The body is not the expected JSON document.
    #[error("failed to decode registry response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Returns the registry error, if this is one.
    pub fn as_registry(&self) -> Option<&RegistryError> {
        match self {
            ClientError::Registry(error) => Some(error),
            _ => None,
        }
    }
}
