use crate::engine::data::{IdGenerator, OrderBook, RandomIdGenerator, TradeLedger};
use crate::engine::entry::trade::timestamp_now;
use crate::engine::entry::{Order, OrderSide, Trade};
use std::sync::{Mutex, PoisonError};

/// Owns the book and the trade ledger of one instrument.
///
/// `match_order` pops, inspects and restores resting orders across many book
/// calls; the whole sequence runs under `crossing`, so concurrent callers are
/// serialized per book and never see or consume the same liquidity twice.
pub struct OrderMatcher {
    orderbook: OrderBook,
    ledger: TradeLedger,
    id_generator: Box<dyn IdGenerator>,
    crossing: Mutex<()>,
}

impl OrderMatcher {
    pub fn new() -> Self {
        Self::with_id_generator(Box::new(RandomIdGenerator::new()))
    }

    pub fn with_id_generator(id_generator: Box<dyn IdGenerator>) -> Self {
        Self {
            orderbook: OrderBook::new(),
            ledger: TradeLedger::new(),
            id_generator,
            crossing: Mutex::new(()),
        }
    }

    /// Read-only view of the book. Resting liquidity only changes through
    /// `match_order`, so the book can never be left crossed from outside:
    ///
    /// ```compile_fail
    /// use order_matcher::engine::{Order, OrderMatcher};
    /// use rust_decimal::Decimal;
    ///
    /// let matcher = OrderMatcher::new();
    /// matcher.order_book().add_order(Order::buy(Decimal::TEN, Decimal::ONE, 1));
    /// ```
    pub fn order_book(&self) -> &OrderBook {
        &self.orderbook
    }

    /// Read-only view of the trades recorded so far.
    ///
    /// ```compile_fail
    /// use order_matcher::engine::{OrderMatcher, Trade};
    /// use rust_decimal::Decimal;
    ///
    /// let matcher = OrderMatcher::new();
    /// matcher.ledger().add_trade(Trade::new(1, Decimal::TEN, Decimal::ONE, 1, 2, 0));
    /// ```
    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    /// Crosses `order` against the opposite side of the book and rests any
    /// unfilled remainder. Returns the trades produced, in execution order.
    pub fn match_order(&self, mut order: Order) -> Vec<Trade> {
        let _crossing = self.crossing.lock().unwrap_or_else(PoisonError::into_inner);
        let now = timestamp_now();
        let mut trades = Vec::new();

        while !order.is_filled() {
            let Some(mut resting) = self.orderbook.pop_best(order.side.opposite()) else {
                break;
            };

            // Sides are price-sorted: if the best one does not cross, none will.
            if !order.crosses(&resting) {
                self.orderbook.restore_order(resting);
                break;
            }

            let fill = order.quantity.min(resting.quantity);
            let (buyer_id, seller_id) = match order.side {
                OrderSide::Buy => (order.id, resting.id),
                OrderSide::Sell => (resting.id, order.id),
            };
            let trade = Trade::new(
                self.id_generator.generate(),
                resting.price,
                fill,
                buyer_id,
                seller_id,
                now,
            );

            order.quantity -= fill;
            resting.quantity -= fill;
            self.ledger.add_trade(trade.clone());
            trades.push(trade);

            if !resting.is_filled() {
                // the taker was the binding side and is now exhausted
                self.orderbook.restore_order(resting);
                break;
            }
        }

        if !order.is_filled() {
            self.orderbook.add_order(order);
        }

        trades
    }
}

impl Default for OrderMatcher {
    fn default() -> Self {
        Self::new()
    }
}
