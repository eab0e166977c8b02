//! Match Logic Module
//!
//! Implements the crossing algorithm that pairs an incoming order with resting
//! orders on the opposite side using price-time priority. Trades execute at
//! the resting order's price.

pub mod matcher;

pub use matcher::OrderMatcher;
