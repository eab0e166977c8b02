//! FIFO hand-off between the feed reader and the matching workers.

use crate::engine::entry::Order;
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct QueueState {
    orders: VecDeque<Order>,
    done: bool,
}

/// Blocking multi-producer, multi-consumer order queue.
///
/// Closing the queue with `set_done` does not discard queued orders: `pop`
/// keeps returning them and only reports `Error::QueueClosed` once the queue
/// is both closed and empty.
#[derive(Debug, Default)]
pub struct IntakeQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl IntakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an order and wakes one waiting worker. Rejected once the
    /// queue is closed, since no worker may be left to drain it.
    pub fn add(&self, order: Order) -> Result<()> {
        {
            let mut state = self.state();
            if state.done {
                return Err(Error::QueueClosed);
            }
            state.orders.push_back(order);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Blocks until an order is available or the queue is closed and empty.
    pub fn pop(&self) -> Result<Order> {
        let mut state = self
            .available
            .wait_while(self.state(), |s| s.orders.is_empty() && !s.done)
            .unwrap_or_else(PoisonError::into_inner);
        state.orders.pop_front().ok_or(Error::QueueClosed)
    }

    /// Marks the queue closed and wakes every waiting worker. Idempotent.
    pub fn set_done(&self) {
        self.state().done = true;
        self.available.notify_all();
    }

    pub fn is_done(&self) -> bool {
        self.state().done
    }

    pub fn len(&self) -> usize {
        self.state().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().orders.is_empty()
    }
}
