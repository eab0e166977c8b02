//! Single-instrument limit order matching engine.
//!
//! Orders arrive from a newline-framed TCP feed, pass through a blocking
//! intake queue and are matched by a pool of worker threads against one
//! shared order book using price-time priority. Trades execute at the
//! resting order's price and are kept in an append-only ledger.

pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod server;
pub mod worker;

pub use error::{Error, Result};
