//! Shared identifier and money types for the booking orchestrator.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{ProviderId, PurchaseId, UserId};
