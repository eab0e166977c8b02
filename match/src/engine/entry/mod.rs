pub mod order;
pub mod trade;

pub use order::{Order, OrderSide};
pub use trade::Trade;
