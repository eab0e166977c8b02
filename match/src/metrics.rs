//! Metrics collection module for the matching service
//!
//! Counters and histograms registered with a process-wide Prometheus registry
//! and served as text exposition by the service binary.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::{Duration, Instant};

lazy_static! {
    /// Global Prometheus registry instance
    pub static ref REGISTRY_INSTANCE: Registry = Registry::new();

    /// Orders accepted from the feed, by side
    pub static ref ORDER_COUNTER_VEC: CounterVec =
        CounterVec::new(Opts::new("orders_received", "orders accepted from the feed"), &["side"]).unwrap();

    /// Feed records that were rejected, by reason
    pub static ref REJECT_COUNTER_VEC: CounterVec =
        CounterVec::new(Opts::new("records_rejected", "feed records rejected"), &["reason"]).unwrap();

    /// Trades appended to the ledger
    pub static ref TRADE_COUNTER: Counter =
        Counter::new("trades_executed", "trades appended to the ledger").unwrap();

    /// Wall time spent inside instrumented calls, by method
    pub static ref METHOD_HISTOGRAM: HistogramVec = HistogramVec::new(
        HistogramOpts::new("method_cost", "method cost in seconds"),
        &["method"]
    )
    .unwrap();

    /// Calls to instrumented methods, by method
    pub static ref REQ_COUNTER_VEC: CounterVec =
        CounterVec::new(Opts::new("request_counter", "request counter"), &["method"]).unwrap();
}

/// Registers every collector with the global registry. Safe to call more than once.
pub fn init_registry() {
    let _ = REGISTRY_INSTANCE.register(Box::new(ORDER_COUNTER_VEC.clone()));
    let _ = REGISTRY_INSTANCE.register(Box::new(REJECT_COUNTER_VEC.clone()));
    let _ = REGISTRY_INSTANCE.register(Box::new(TRADE_COUNTER.clone()));
    let _ = REGISTRY_INSTANCE.register(Box::new(METHOD_HISTOGRAM.clone()));
    let _ = REGISTRY_INSTANCE.register(Box::new(REQ_COUNTER_VEC.clone()));
}

/// Runs `handler`, counting the call and recording its duration under `method_name`.
pub fn record_metrics<F, T>(method_name: &'static str, handler: F) -> T
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    REQ_COUNTER_VEC.with_label_values(&[method_name]).inc();
    let result = handler();

    let elapsed = start.elapsed();
    METHOD_HISTOGRAM
        .with_label_values(&[method_name])
        .observe(elapsed.as_secs_f64());

    result
}

/// Mean recorded duration of `method_name`, `None` before its first call.
pub fn mean_latency(method_name: &str) -> Option<Duration> {
    let histogram = METHOD_HISTOGRAM.with_label_values(&[method_name]);
    match histogram.get_sample_count() {
        0 => None,
        n => Some(Duration::from_secs_f64(histogram.get_sample_sum() / n as f64)),
    }
}

/// Current registry contents in the Prometheus text format.
pub fn gather_text() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY_INSTANCE.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        log::error!("failed to encode metrics: {}", e);
    }
    buffer
}
