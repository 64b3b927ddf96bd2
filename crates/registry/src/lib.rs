//! Provider registry: the set of configured airline backends.
//!
//! Pure data access — providers are immutable during an orchestration run
//! and change only through administrative updates.

pub mod error;
pub mod provider;
pub mod store;

pub use error::RegistryError;
pub use provider::{AuthMode, Provider};
pub use store::{InMemoryProviderStore, ProviderStore};
