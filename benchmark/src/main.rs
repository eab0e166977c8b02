use clap::{Parser, ValueEnum};
use hdrhistogram::Histogram;
use order_matcher::engine::{
    IdGenerator, IntakeQueue, Order, OrderMatcher, OrderSide, RandomIdGenerator,
    SequentialIdGenerator,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TradeIds {
    Random,
    Sequential,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of matching worker threads
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Number of producer threads feeding the queue
    #[arg(short, long, default_value = "1")]
    producers: usize,

    /// Orders generated by each producer
    #[arg(short, long, default_value = "100000")]
    orders: u64,

    /// Trade id issuance scheme
    #[arg(short, long, value_enum, default_value = "random")]
    trade_ids: TradeIds,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    orders: u64,
    elapsed_ms: u128,
    orders_per_sec: f64,
    trades: usize,
    traded_quantity: Decimal,
    resting_buys: usize,
    resting_sells: usize,
    p50_us: f64,
    p99_us: f64,
    max_us: f64,
}

/// Same shape as the feed simulator: price 10-200 and quantity 1-100, both at 2dp.
fn random_order(rng: &mut StdRng, id: u64) -> Order {
    let side = if rng.gen_bool(0.5) {
        OrderSide::Buy
    } else {
        OrderSide::Sell
    };
    let price = Decimal::new(rng.gen_range(1_000..=20_000), 2);
    let quantity = Decimal::new(rng.gen_range(100..=10_000), 2);
    Order::new(side, price, quantity, id, 0)
}

fn main() -> anyhow::Result<()> {
    env_logger::try_init().unwrap_or_default();
    let args = Args::parse();
    anyhow::ensure!(args.workers > 0, "at least one worker is required");

    let id_generator: Box<dyn IdGenerator> = match args.trade_ids {
        TradeIds::Random => Box::new(RandomIdGenerator::new()),
        TradeIds::Sequential => Box::new(SequentialIdGenerator::new()),
    };
    let matcher = Arc::new(OrderMatcher::with_id_generator(id_generator));
    let queue = Arc::new(IntakeQueue::new());
    let histogram = Arc::new(Mutex::new(Histogram::<u64>::new(3)?));

    println!(
        "Starting benchmark with {} producer(s) x {} orders, {} worker(s)",
        args.producers, args.orders, args.workers
    );

    let start = Instant::now();

    let mut workers = vec![];
    for _ in 0..args.workers {
        let queue = queue.clone();
        let matcher = matcher.clone();
        let histogram = histogram.clone();
        workers.push(thread::spawn(move || {
            let mut local = Histogram::<u64>::new(3).expect("valid histogram precision");
            while let Ok(order) = queue.pop() {
                let begin = Instant::now();
                matcher.match_order(order);
                let _ = local.record(begin.elapsed().as_nanos() as u64);
            }
            if let Ok(mut shared) = histogram.lock() {
                let _ = shared.add(&local);
            }
        }));
    }

    let mut producers = vec![];
    for p in 0..args.producers {
        let queue = queue.clone();
        let orders = args.orders;
        producers.push(thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(p as u64);
            for i in 0..orders {
                let id = p as u64 * orders + i + 1;
                if queue.add(random_order(&mut rng, id)).is_err() {
                    break;
                }
            }
        }));
    }

    for producer in producers {
        let _ = producer.join();
    }
    queue.set_done();
    for worker in workers {
        let _ = worker.join();
    }

    let elapsed = start.elapsed();
    let total = args.orders * args.producers as u64;
    let histogram = histogram
        .lock()
        .map_err(|_| anyhow::anyhow!("latency histogram lock poisoned"))?;
    let book = matcher.order_book();
    let micros = |nanos: u64| Duration::from_nanos(nanos).as_secs_f64() * 1e6;

    let report = Report {
        orders: total,
        elapsed_ms: elapsed.as_millis(),
        orders_per_sec: total as f64 / elapsed.as_secs_f64(),
        trades: matcher.ledger().len(),
        traded_quantity: matcher.ledger().volume(),
        resting_buys: book.depth(OrderSide::Buy).len(),
        resting_sells: book.depth(OrderSide::Sell).len(),
        p50_us: micros(histogram.value_at_quantile(0.50)),
        p99_us: micros(histogram.value_at_quantile(0.99)),
        max_us: micros(histogram.max()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Benchmark completed:");
        println!("Total orders: {}", report.orders);
        println!("Elapsed: {} ms", report.elapsed_ms);
        println!("Throughput: {:.0} orders/sec", report.orders_per_sec);
        println!("Trades: {} ({} traded)", report.trades, report.traded_quantity);
        println!(
            "Resting: {} buy(s), {} sell(s)",
            report.resting_buys, report.resting_sells
        );
        println!("Match latency p50: {:.2} us", report.p50_us);
        println!("Match latency p99: {:.2} us", report.p99_us);
        println!("Match latency max: {:.2} us", report.max_us);
    }

    Ok(())
}
