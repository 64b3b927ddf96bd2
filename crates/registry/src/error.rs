//! Registry error types.

use common::ProviderId;
use thiserror::Error;

/// Errors raised by provider registry lookups.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No provider is configured under the given id.
    #[error("Provider not found: {0}")]
    NotFound(ProviderId),

    /// The underlying store could not be read.
    #[error("Provider lookup failed: {0}")]
    LookupFailed(String),

    /// The provider configuration could not be parsed.
    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// Convenience type alias for registry results.
pub type Result<T> = std::result::Result<T, RegistryError>;
