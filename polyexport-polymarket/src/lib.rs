//! Polymarket integration for the event exporter
//!
//! This crate provides a client for the two public endpoints the exporter
//! needs: the Gamma API event listing (by slug) and the CLOB price history.
//! Neither requires authentication.

pub mod client;
pub mod types;

pub use client::{MarketDataSource, PolymarketClient};
pub use types::{PolymarketEvent, PolymarketMarket, PriceHistoryPoint, PricesHistoryResponse};
