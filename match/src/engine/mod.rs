//! Match Engine Module
//!
//! Core components of the single-instrument matching engine:
//! - `entry`: order and trade types
//! - `data`: order book, trade ledger and id generation
//! - `matchlogic`: the crossing algorithm
//! - `intake`: the queue that hands orders to the worker pool

pub mod data;
pub mod entry;
pub mod intake;
pub mod matchlogic;

pub use data::{IdGenerator, OrderBook, RandomIdGenerator, SequentialIdGenerator, TradeLedger};
pub use entry::{Order, OrderSide, Trade};
pub use intake::IntakeQueue;
pub use matchlogic::OrderMatcher;
