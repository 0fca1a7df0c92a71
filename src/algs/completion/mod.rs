//! Neighbor exchanges over the copies of shared entities.

pub mod entity_exchange;

pub use entity_exchange::{ExchangeHandle, exchange_shared};
