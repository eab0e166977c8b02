//! Feed intake loop.
//!
//! Reads orders from an `OrderSource` and appends them to the intake queue
//! until the stop flag is raised or the source fails. Whether a malformed
//! record ends intake or is skipped, and how many consecutive read timeouts
//! are tolerated, is decided by `IntakePolicy`, not by the reader.

use crate::config::{MalformedPolicy, RuntimeConfig};
use crate::engine::entry::Order;
use crate::engine::IntakeQueue;
use crate::error::{Error, Result};
use crate::metrics;
use std::sync::atomic::{AtomicBool, Ordering};

/// Anything that yields validated orders one at a time.
pub trait OrderSource {
    fn read_next_order(&mut self) -> Result<Order>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakePolicy {
    pub on_malformed: MalformedPolicy,
    /// 0 keeps waiting through any number of timeouts
    pub max_consecutive_timeouts: u32,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            on_malformed: MalformedPolicy::Abandon,
            max_consecutive_timeouts: 3,
        }
    }
}

impl From<&RuntimeConfig> for IntakePolicy {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            on_malformed: config.on_malformed,
            max_consecutive_timeouts: config.max_consecutive_timeouts,
        }
    }
}

#[derive(Debug)]
pub enum IntakeExit {
    /// The stop flag was raised
    Stopped,
    /// The source or the queue failed; no further orders were read
    Failed(Error),
}

#[derive(Debug)]
pub struct IntakeSummary {
    pub accepted: usize,
    pub skipped: usize,
    pub exit: IntakeExit,
}

pub fn run_intake<S: OrderSource + ?Sized>(
    source: &mut S,
    queue: &IntakeQueue,
    stop: &AtomicBool,
    policy: IntakePolicy,
) -> IntakeSummary {
    let mut accepted = 0;
    let mut skipped = 0;
    let mut timeouts = 0u32;

    let exit = loop {
        if stop.load(Ordering::SeqCst) {
            break IntakeExit::Stopped;
        }

        match source.read_next_order() {
            Ok(order) => {
                timeouts = 0;
                log::info!("received order {}", order);
                metrics::ORDER_COUNTER_VEC
                    .with_label_values(&[order.side.as_str()])
                    .inc();
                if let Err(e) = queue.add(order) {
                    log::error!("intake queue rejected order: {}", e);
                    break IntakeExit::Failed(e);
                }
                accepted += 1;
            }
            Err(Error::Timeout(after)) => {
                timeouts += 1;
                if policy.max_consecutive_timeouts > 0 && timeouts >= policy.max_consecutive_timeouts {
                    log::error!("no order received in {} consecutive reads of {:?}", timeouts, after);
                    break IntakeExit::Failed(Error::Timeout(after));
                }
                log::debug!("no order received within {:?}", after);
            }
            Err(Error::Protocol(msg)) if policy.on_malformed == MalformedPolicy::Skip => {
                timeouts = 0;
                skipped += 1;
                metrics::REJECT_COUNTER_VEC.with_label_values(&["protocol"]).inc();
                log::warn!("skipping feed record: {}", msg);
            }
            Err(e) => {
                if let Error::Protocol(_) = e {
                    metrics::REJECT_COUNTER_VEC.with_label_values(&["protocol"]).inc();
                }
                log::error!("error reading order: {}", e);
                break IntakeExit::Failed(e);
            }
        }
    };

    IntakeSummary {
        accepted,
        skipped,
        exit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    /// Replays `script`, then raises `stop` (if given) or reports peer close.
    struct ScriptedSource {
        script: VecDeque<Result<Order>>,
        stop: Option<Arc<AtomicBool>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Order>>) -> Self {
            Self {
                script: script.into(),
                stop: None,
            }
        }
    }

    impl OrderSource for ScriptedSource {
        fn read_next_order(&mut self) -> Result<Order> {
            match self.script.pop_front() {
                Some(next) => next,
                None => match &self.stop {
                    Some(stop) => {
                        stop.store(true, Ordering::SeqCst);
                        Err(Error::Timeout(Duration::from_millis(1)))
                    }
                    None => Err(Error::PeerClosed),
                },
            }
        }
    }

    fn bad_record() -> Result<Order> {
        Err(Error::Protocol("invalid order format: \"x\"".to_string()))
    }

    #[test]
    fn test_abandon_stops_on_first_malformed_record() {
        let mut source = ScriptedSource::new(vec![
            Ok(Order::buy(dec!(10), dec!(1), 1)),
            bad_record(),
            Ok(Order::buy(dec!(10), dec!(1), 2)),
        ]);
        let queue = IntakeQueue::new();
        let summary = run_intake(&mut source, &queue, &AtomicBool::new(false), IntakePolicy::default());

        assert_eq!(summary.accepted, 1);
        assert!(matches!(summary.exit, IntakeExit::Failed(Error::Protocol(_))));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_skip_keeps_reading_past_malformed_records() {
        let mut source = ScriptedSource::new(vec![
            Ok(Order::buy(dec!(10), dec!(1), 1)),
            bad_record(),
            Ok(Order::sell(dec!(11), dec!(1), 2)),
        ]);
        let queue = IntakeQueue::new();
        let policy = IntakePolicy {
            on_malformed: MalformedPolicy::Skip,
            ..IntakePolicy::default()
        };
        let summary = run_intake(&mut source, &queue, &AtomicBool::new(false), policy);

        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.skipped, 1);
        assert!(matches!(summary.exit, IntakeExit::Failed(Error::PeerClosed)));
        assert_eq!(queue.pop().unwrap().id, 1);
        assert_eq!(queue.pop().unwrap().id, 2);
    }

    #[test]
    fn test_consecutive_timeouts_end_intake() {
        let timeout = || -> Result<Order> { Err(Error::Timeout(Duration::from_secs(5))) };
        let mut source = ScriptedSource::new(vec![
            timeout(),
            Ok(Order::buy(dec!(10), dec!(1), 1)),
            timeout(),
            timeout(),
            timeout(),
            Ok(Order::buy(dec!(10), dec!(1), 2)),
        ]);
        let queue = IntakeQueue::new();
        let summary = run_intake(&mut source, &queue, &AtomicBool::new(false), IntakePolicy::default());

        assert_eq!(summary.accepted, 1);
        assert!(matches!(summary.exit, IntakeExit::Failed(Error::Timeout(_))));
    }

    #[test]
    fn test_stop_flag_ends_intake() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut source = ScriptedSource {
            script: vec![
                Ok(Order::buy(dec!(10), dec!(1), 1)),
                Ok(Order::buy(dec!(10), dec!(1), 2)),
            ]
            .into(),
            stop: Some(stop.clone()),
        };
        let queue = IntakeQueue::new();
        let policy = IntakePolicy {
            max_consecutive_timeouts: 0,
            ..IntakePolicy::default()
        };
        let summary = run_intake(&mut source, &queue, &stop, policy);

        assert_eq!(summary.accepted, 2);
        assert!(matches!(summary.exit, IntakeExit::Stopped));
    }

    #[test]
    fn test_closed_queue_ends_intake() {
        let mut source = ScriptedSource::new(vec![Ok(Order::sell(dec!(3), dec!(1), 1))]);
        let queue = IntakeQueue::new();
        queue.set_done();
        let summary = run_intake(&mut source, &queue, &AtomicBool::new(false), IntakePolicy::default());

        assert_eq!(summary.accepted, 0);
        assert!(matches!(summary.exit, IntakeExit::Failed(Error::QueueClosed)));
    }
}
