//! Route handlers.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod providers;
pub mod purchases;
