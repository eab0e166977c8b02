use crate::engine::entry::{Order, OrderSide};
use rust_decimal::Decimal;
use std::collections::btree_map::OccupiedEntry;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// price -> orders in arrival order
type PriceLevels = BTreeMap<Decimal, VecDeque<Order>>;

/// Resting orders for one instrument.
///
/// Bids are served highest price first and asks lowest price first; within a
/// price level orders keep arrival order. Each side sits behind its own lock,
/// so buy-side calls never wait on sell-side calls. Individual calls are
/// atomic, sequences of calls are not: callers that pop, inspect and restore
/// must hold their own lock across the sequence (see `OrderMatcher`). For that
/// reason the mutators are crate-private and outside callers only ever read.
#[derive(Debug, Default)]
pub struct OrderBook {
    bids: Mutex<PriceLevels>,
    asks: Mutex<PriceLevels>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn levels(&self, side: OrderSide) -> MutexGuard<'_, PriceLevels> {
        let levels = match side {
            OrderSide::Buy => &self.bids,
            OrderSide::Sell => &self.asks,
        };
        levels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an order behind every resting order at its price.
    pub(crate) fn add_order(&self, order: Order) {
        if order.is_filled() {
            log::warn!("refusing to rest order {} with no remaining quantity", order.id);
            return;
        }
        self.levels(order.side)
            .entry(order.price)
            .or_default()
            .push_back(order);
    }

    /// Puts back an order taken with `pop_best`, ahead of everything else at
    /// its price, so it keeps its time priority.
    pub(crate) fn restore_order(&self, order: Order) {
        if order.is_filled() {
            log::warn!("refusing to restore order {} with no remaining quantity", order.id);
            return;
        }
        self.levels(order.side)
            .entry(order.price)
            .or_default()
            .push_front(order);
    }

    /// Removes and returns the highest-priority order on `side`.
    pub(crate) fn pop_best(&self, side: OrderSide) -> Option<Order> {
        match side {
            OrderSide::Buy => self.pop_best_buy(),
            OrderSide::Sell => self.pop_best_sell(),
        }
    }

    pub(crate) fn pop_best_buy(&self) -> Option<Order> {
        let mut levels = self.levels(OrderSide::Buy);
        Self::take_front(levels.last_entry()?)
    }

    pub(crate) fn pop_best_sell(&self) -> Option<Order> {
        let mut levels = self.levels(OrderSide::Sell);
        Self::take_front(levels.first_entry()?)
    }

    fn take_front(mut level: OccupiedEntry<'_, Decimal, VecDeque<Order>>) -> Option<Order> {
        let order = level.get_mut().pop_front();
        if level.get().is_empty() {
            level.remove();
        }
        order
    }

    pub fn has_buy(&self) -> bool {
        !self.levels(OrderSide::Buy).is_empty()
    }

    pub fn has_sell(&self) -> bool {
        !self.levels(OrderSide::Sell).is_empty()
    }

    pub fn get_best_bid(&self) -> Option<Decimal> {
        self.levels(OrderSide::Buy).keys().next_back().copied()
    }

    pub fn get_best_ask(&self) -> Option<Decimal> {
        self.levels(OrderSide::Sell).keys().next().copied()
    }

    pub fn get_spread(&self) -> Option<Decimal> {
        match (self.get_best_ask(), self.get_best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Copy of the resting orders on `side`, best first.
    pub fn depth(&self, side: OrderSide) -> Vec<Order> {
        let levels = self.levels(side);
        match side {
            OrderSide::Buy => levels.values().rev().flatten().cloned().collect(),
            OrderSide::Sell => levels.values().flatten().cloned().collect(),
        }
    }

    /// Number of resting orders on both sides.
    pub fn len(&self) -> usize {
        let bids: usize = self.levels(OrderSide::Buy).values().map(VecDeque::len).sum();
        let asks: usize = self.levels(OrderSide::Sell).values().map(VecDeque::len).sum();
        bids + asks
    }

    pub fn is_empty(&self) -> bool {
        !self.has_buy() && !self.has_sell()
    }
}
