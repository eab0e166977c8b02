use crate::engine::entry::Trade;
use crate::metrics;
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Append-only record of executed trades.
#[derive(Debug, Default)]
pub struct TradeLedger {
    trades: Mutex<Vec<Trade>>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn trades(&self) -> MutexGuard<'_, Vec<Trade>> {
        self.trades.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn add_trade(&self, trade: Trade) {
        log::info!(
            "trade made: buyer {} seller {} price {} quantity {}",
            trade.buyer_id,
            trade.seller_id,
            trade.price,
            trade.quantity
        );
        metrics::TRADE_COUNTER.inc();
        self.trades().push(trade);
    }

    /// Snapshot of every trade recorded so far, oldest first.
    pub fn get_trades(&self) -> Vec<Trade> {
        self.trades().clone()
    }

    pub fn len(&self) -> usize {
        self.trades().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades().is_empty()
    }

    /// Sum of traded quantity.
    pub fn volume(&self) -> Decimal {
        self.trades().iter().map(|t| t.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_snapshot_is_a_copy() {
        let ledger = TradeLedger::new();
        ledger.add_trade(Trade::new(1, dec!(10), dec!(2), 11, 12, 0));

        let snapshot = ledger.get_trades();
        ledger.add_trade(Trade::new(2, dec!(11), dec!(3), 13, 14, 0));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get_trades()[0], snapshot[0]);
        assert_eq!(ledger.volume(), dec!(5));
    }

    #[test]
    fn test_concurrent_appends_are_all_kept() {
        let ledger = Arc::new(TradeLedger::new());
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    for i in 0..100u64 {
                        ledger.add_trade(Trade::new(t * 100 + i, dec!(1), dec!(1), 1, 2, 0));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ledger.len(), 800);
        assert_eq!(ledger.volume(), dec!(800));
    }
}
