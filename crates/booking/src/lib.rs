//! Multi-provider booking orchestration.
//!
//! This crate owns the agency-side semantics: merging provider carts into
//! one view, running the forward-only checkout saga, and keeping the
//! purchase ledger reconciled with provider-side reality.

pub mod cart;
pub mod checkout;
pub mod error;
pub mod run;
pub mod sync;

pub use cart::{AggregatedCart, CartAggregator, CartItem};
pub use checkout::{CheckoutOrchestrator, CheckoutOutcome};
pub use error::{BookingError, ProviderFailure};
pub use run::{CheckoutRun, ProviderPartition, RunState};
pub use sync::{CancelOutcome, StateSynchronizer};
