//! Gateway error taxonomy.

use common::ProviderId;
use thiserror::Error;

/// Errors raised by provider gateway calls.
///
/// Transport-level failures (`Timeout`, `Unreachable`) are recoverable
/// wherever the operation tolerates partial results; `Rejected` carries the
/// provider's own error message when its body yields one.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider did not answer within its configured timeout.
    #[error("Provider {provider} timed out")]
    Timeout { provider: ProviderId },

    /// The provider could not be reached at the transport level.
    #[error("Provider {provider} unreachable: {reason}")]
    Unreachable { provider: ProviderId, reason: String },

    /// The provider answered with a 4xx/5xx status.
    #[error("Provider {provider} rejected the request ({status}): {message}")]
    Rejected {
        provider: ProviderId,
        status: u16,
        message: String,
    },

    /// The authentication handshake with the provider failed.
    #[error("Credential error for provider {provider}: {reason}")]
    Credential { provider: ProviderId, reason: String },

    /// The provider answered 2xx but the body could not be interpreted.
    #[error("Invalid response from provider {provider}: {reason}")]
    InvalidResponse { provider: ProviderId, reason: String },
}

impl GatewayError {
    /// The provider the failing call was scoped to.
    pub fn provider(&self) -> &ProviderId {
        match self {
            GatewayError::Timeout { provider }
            | GatewayError::Unreachable { provider, .. }
            | GatewayError::Rejected { provider, .. }
            | GatewayError::Credential { provider, .. }
            | GatewayError::InvalidResponse { provider, .. } => provider,
        }
    }

    /// True for transport-level failures that aggregation treats as
    /// "skip this provider" rather than a hard error.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GatewayError::Timeout { .. } | GatewayError::Unreachable { .. }
        )
    }
}

/// Convenience type alias for gateway results.
pub type Result<T> = std::result::Result<T, GatewayError>;
