//! Matching worker pool.
//!
//! Each worker loops on `IntakeQueue::pop` and hands every order to the shared
//! matcher. Workers stop only when the queue reports it is closed and empty,
//! so orders accepted before shutdown are always matched.

use crate::engine::{IntakeQueue, OrderMatcher};
use crate::metrics;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Drains `queue` into `matcher` until the queue is closed and empty.
/// Returns the number of orders taken off the queue.
pub fn process_orders(queue: &IntakeQueue, matcher: &OrderMatcher) -> usize {
    let worker = thread::current().name().unwrap_or("worker").to_string();
    let mut processed = 0;

    while let Ok(order) = queue.pop() {
        processed += 1;
        let order_id = order.id;
        log::debug!("processing order ({}) {}", worker, order);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            metrics::record_metrics("match_order", || matcher.match_order(order))
        }));
        match result {
            Ok(trades) => {
                log::debug!("order {} produced {} trade(s)", order_id, trades.len());
            }
            Err(_) => {
                log::error!("error processing order {} on {}", order_id, worker);
            }
        }
    }

    log::debug!("{} observed queue closure after {} order(s)", worker, processed);
    processed
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<usize>>,
}

impl WorkerPool {
    pub fn spawn(size: usize, queue: Arc<IntakeQueue>, matcher: Arc<OrderMatcher>) -> io::Result<Self> {
        let mut handles = Vec::with_capacity(size);
        for i in 0..size {
            let queue = queue.clone();
            let matcher = matcher.clone();
            let handle = thread::Builder::new()
                .name(format!("matcher-worker-{}", i))
                .spawn(move || process_orders(&queue, &matcher))?;
            handles.push(handle);
        }
        log::info!("started {} matching worker(s)", size);
        Ok(Self { handles })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker to exit. Returns the total number of orders processed.
    pub fn join(self) -> usize {
        self.handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(processed) => processed,
                Err(_) => {
                    log::error!("matching worker terminated abnormally");
                    0
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Order, OrderSide, SequentialIdGenerator};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_workers_drain_queue_before_exiting() {
        let queue = Arc::new(IntakeQueue::new());
        let matcher = Arc::new(OrderMatcher::with_id_generator(Box::new(
            SequentialIdGenerator::new(),
        )));

        for id in 1..=200u64 {
            queue.add(Order::buy(dec!(10), dec!(1), id)).unwrap();
        }
        queue.set_done();

        let pool = WorkerPool::spawn(4, queue.clone(), matcher.clone()).unwrap();
        assert_eq!(pool.size(), 4);
        assert_eq!(pool.join(), 200);
        assert!(queue.is_empty());
        assert_eq!(matcher.order_book().depth(OrderSide::Buy).len(), 200);
    }

    #[test]
    fn test_workers_match_orders_added_while_running() {
        let queue = Arc::new(IntakeQueue::new());
        let matcher = Arc::new(OrderMatcher::with_id_generator(Box::new(
            SequentialIdGenerator::new(),
        )));
        let pool = WorkerPool::spawn(2, queue.clone(), matcher.clone()).unwrap();

        for id in 1..=50u64 {
            queue.add(Order::sell(dec!(20), dec!(2), id)).unwrap();
        }
        for id in 51..=100u64 {
            queue.add(Order::buy(dec!(20), dec!(2), id)).unwrap();
        }
        queue.set_done();

        assert_eq!(pool.join(), 100);
        let book = matcher.order_book();
        // every buy crosses any resting sell at the same price, so at most one side rests
        assert!(!(book.has_buy() && book.has_sell()));
        let resting: Decimal = book
            .depth(OrderSide::Buy)
            .iter()
            .chain(book.depth(OrderSide::Sell).iter())
            .map(|o| o.quantity)
            .sum();
        assert_eq!(matcher.ledger().volume() * dec!(2) + resting, dec!(200));
    }

    #[test]
    fn test_process_orders_returns_when_closed() {
        let queue = IntakeQueue::new();
        let matcher = OrderMatcher::new();
        queue.add(Order::sell(dec!(3), dec!(1), 1)).unwrap();
        queue.set_done();
        assert_eq!(process_orders(&queue, &matcher), 1);
        assert!(matcher.order_book().has_sell());
    }
}
