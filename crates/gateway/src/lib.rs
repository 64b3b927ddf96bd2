//! Authenticated HTTP access to provider backends.
//!
//! One gateway call is always scoped to exactly one provider: it resolves
//! the base URL and timeout from the provider configuration, headers from
//! the credential cache plus the forwarded end-user identity, and maps
//! transport/HTTP failures into a uniform error taxonomy.
//!
//! The gateway never retries — retrying non-idempotent calls (add-item,
//! checkout) is unsafe at this layer, so retry policy is left to the
//! orchestrator.

pub mod api;
pub mod cache;
pub mod client;
pub mod error;
pub mod identity;
pub mod normalize;
pub mod types;

pub use api::{InMemoryProviderApi, ProviderApi};
pub use cache::CredentialCache;
pub use client::ProviderGateway;
pub use error::GatewayError;
pub use identity::Identity;
pub use types::{
    BillingDetails, CardDetails, CheckoutReceipt, PaymentDetails, ProviderCart, ProviderCartItem,
    ReservationDetail,
};
