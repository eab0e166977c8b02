//! Trade Types and Structures
//!
//! A trade records one fill between a buy order and a sell order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A completed fill. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Identifier issued by the matcher's id generator
    pub id: u64,
    /// Execution price, always the resting (maker) order's price
    pub price: Decimal,
    /// Filled quantity
    pub quantity: Decimal,
    /// ID of the buy order
    pub buyer_id: u64,
    /// ID of the sell order
    pub seller_id: u64,
    /// Nanoseconds since the Unix epoch
    pub timestamp: u64,
}

impl Trade {
    pub fn new(
        id: u64,
        price: Decimal,
        quantity: Decimal,
        buyer_id: u64,
        seller_id: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            id,
            price,
            quantity,
            buyer_id,
            seller_id,
            timestamp,
        }
    }

    /// Price times quantity
    pub fn total_amount(&self) -> Decimal {
        self.price * self.quantity
    }
}

/// Current wall-clock time in nanoseconds since the Unix epoch.
pub fn timestamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_amount() {
        let trade = Trade::new(7, dec!(15.5), dec!(4), 1, 2, timestamp_now());
        assert_eq!(trade.total_amount(), dec!(62.0));
        assert!(trade.timestamp > 0);
    }
}
