use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderSide {
    #[default]
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(format!("unknown order side: {}", other)),
        }
    }
}

/// A limit order for the single instrument this engine trades.
///
/// `quantity` is the remaining quantity: it is decremented in place while the
/// order fills, so an order sitting in the book always has `quantity > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub timestamp: u64,
}

impl Order {
    pub fn new(side: OrderSide, price: Decimal, quantity: Decimal, id: u64, timestamp: u64) -> Self {
        Self {
            id,
            side,
            price,
            quantity,
            timestamp,
        }
    }

    pub fn buy(price: Decimal, quantity: Decimal, id: u64) -> Self {
        Self::new(OrderSide::Buy, price, quantity, id, 0)
    }

    pub fn sell(price: Decimal, quantity: Decimal, id: u64) -> Self {
        Self::new(OrderSide::Sell, price, quantity, id, 0)
    }

    pub fn is_filled(&self) -> bool {
        self.quantity <= Decimal::ZERO
    }

    /// Whether this order, as the taker, can trade against `resting`.
    pub fn crosses(&self, resting: &Order) -> bool {
        match self.side {
            OrderSide::Buy => self.price >= resting.price,
            OrderSide::Sell => self.price <= resting.price,
        }
    }

    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | Price: {} | Qty: {} | ID: {} | Timestamp: {}",
            self.side, self.price, self.quantity, self.id, self.timestamp
        )
    }
}
