use crate::engine::entry::{Order, OrderSide};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

static ORDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(BUY|SELL),(\d+\.?\d*),(\d+\.?\d*),(\d+),(\d+)$").expect("order pattern compiles")
});

/// Parses one feed record (with or without its line terminator) into a
/// validated order.
pub fn parse_order(line: &str) -> Result<Order> {
    let line = line.trim_end_matches(['\n', '\r']);
    let caps = ORDER_PATTERN
        .captures(line)
        .ok_or_else(|| Error::Protocol(format!("invalid order format: {:?}", line)))?;

    let side = OrderSide::from_str(&caps[1]).map_err(Error::Protocol)?;
    let price = parse_decimal(&caps[2], "price")?;
    let quantity = parse_decimal(&caps[3], "quantity")?;
    let id = parse_u64(&caps[4], "order id")?;
    let timestamp = parse_u64(&caps[5], "timestamp")?;

    if price <= Decimal::ZERO {
        return Err(Error::Protocol("invalid price: must be positive".to_string()));
    }
    if quantity <= Decimal::ZERO {
        return Err(Error::Protocol("invalid quantity: must be positive".to_string()));
    }
    if id == 0 {
        return Err(Error::Protocol("invalid order id: cannot be zero".to_string()));
    }

    Ok(Order::new(side, price, quantity, id, timestamp))
}

fn parse_decimal(field: &str, name: &str) -> Result<Decimal> {
    // "12." is accepted by the pattern
    Decimal::from_str(field.trim_end_matches('.'))
        .map_err(|e| Error::Protocol(format!("invalid {} {:?}: {}", name, field, e)))
}

fn parse_u64(field: &str, name: &str) -> Result<u64> {
    field
        .parse::<u64>()
        .map_err(|e| Error::Protocol(format!("invalid {} {:?}: {}", name, field, e)))
}
