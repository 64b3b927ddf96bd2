//! Booking layer error types.

use common::{ProviderId, PurchaseId};
use thiserror::Error;

/// A per-provider failure surfaced alongside a partial outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider_id: ProviderId,
    pub reason: String,
}

/// Errors from cart aggregation, checkout, and reconciliation.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Checkout was requested against a cart with no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The cart cannot be partitioned for checkout.
    #[error("Invalid cart state: {0}")]
    InvalidCartState(String),

    /// A cart operation named an item no enabled provider knows about.
    #[error("Cart item not found: {0}")]
    ItemNotFound(String),

    /// Every provider partition failed to commit; nothing was persisted.
    #[error("Checkout failed on every provider")]
    TotalFailure { failures: Vec<ProviderFailure> },

    /// No purchase with this id is visible to the caller.
    #[error("Purchase not found: {0}")]
    PurchaseNotFound(PurchaseId),

    /// The purchase is already in a terminal state.
    #[error("Purchase is not cancelable: {0}")]
    NotCancelable(PurchaseId),

    /// Cancellation reached no provider; the purchase stays active.
    #[error("Cancellation failed on every provider")]
    CancellationFailed { failures: Vec<ProviderFailure> },

    /// Provider registry error.
    #[error(transparent)]
    Registry(#[from] registry::RegistryError),

    /// Provider gateway error.
    #[error(transparent)]
    Gateway(#[from] gateway::GatewayError),

    /// Purchase ledger error.
    #[error(transparent)]
    Ledger(#[from] ledger::LedgerError),
}

pub type Result<T> = std::result::Result<T, BookingError>;
