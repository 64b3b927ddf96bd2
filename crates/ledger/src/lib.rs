//! The agency's durable record of completed purchases.
//!
//! A purchase record is the source of truth for what the customer bought,
//! independent of later provider-side drift. Writes are single-document
//! upserts keyed by purchase id, last writer wins.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use error::LedgerError;
pub use memory::InMemoryLedger;
pub use model::{PurchaseRecord, PurchaseStatus, SubReservation};
pub use postgres::PostgresLedger;
pub use store::LedgerStore;
