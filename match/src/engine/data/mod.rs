//! Data Module
//!
//! Shared state owned by the matcher:
//! - `orderbook`: resting buy and sell orders, one lock per side
//! - `ledger`: append-only record of executed trades
//! - `id_generator`: trade identifier issuance

pub mod id_generator;
pub mod ledger;
pub mod orderbook;

pub use id_generator::{IdGenerator, RandomIdGenerator, SequentialIdGenerator};
pub use ledger::TradeLedger;
pub use orderbook::OrderBook;
