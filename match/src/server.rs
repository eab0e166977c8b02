use crate::config::{RuntimeConfig, TradeIdScheme};
use crate::engine::{IdGenerator, IntakeQueue, OrderMatcher, RandomIdGenerator, SequentialIdGenerator};
use crate::error::{Error, Result};
use crate::feed::{run_intake, IntakePolicy, IntakeSummary, OrderReader};
use crate::metrics;
use crate::worker::WorkerPool;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Wires the feed reader, the intake queue, the worker pool and the metrics
/// endpoint around one shared matcher.
pub struct Server {
    config: RuntimeConfig,
    queue: Arc<IntakeQueue>,
    matcher: Arc<OrderMatcher>,
    stop: Arc<AtomicBool>,
    workers: Option<WorkerPool>,
}

impl Server {
    pub fn builder(config: RuntimeConfig) -> Self {
        let id_generator: Box<dyn IdGenerator> = match config.trade_ids {
            TradeIdScheme::Random => Box::new(RandomIdGenerator::new()),
            TradeIdScheme::Sequential => Box::new(SequentialIdGenerator::new()),
        };
        Server {
            config,
            queue: Arc::new(IntakeQueue::new()),
            matcher: Arc::new(OrderMatcher::with_id_generator(id_generator)),
            stop: Arc::new(AtomicBool::new(false)),
            workers: None,
        }
    }

    pub fn matcher(&self) -> &Arc<OrderMatcher> {
        &self.matcher
    }

    pub fn queue(&self) -> &Arc<IntakeQueue> {
        &self.queue
    }

    pub async fn start(&mut self) -> Result<()> {
        self.start_metrics_server().await?;
        self.start_workers()
    }

    fn start_workers(&mut self) -> Result<()> {
        let pool = WorkerPool::spawn(
            self.config.worker_threads,
            self.queue.clone(),
            self.matcher.clone(),
        )
        .map_err(|e| Error::Configuration(format!("cannot start worker threads: {}", e)))?;
        self.workers = Some(pool);
        Ok(())
    }

    async fn start_metrics_server(&mut self) -> Result<()> {
        if self.config.metrics_addr.is_empty() {
            return Ok(());
        }
        let addr: SocketAddr = self.config.metrics_addr.parse().map_err(|e| {
            Error::Configuration(format!("invalid metrics_addr {}: {}", self.config.metrics_addr, e))
        })?;
        let make_svc = make_service_fn(|_| async {
            Ok::<_, hyper::Error>(service_fn(|_: Request<Body>| async {
                Ok::<_, hyper::Error>(Response::new(Body::from(metrics::gather_text())))
            }))
        });
        metrics::init_registry();
        let server = hyper::Server::try_bind(&addr)
            .map_err(|e| Error::Configuration(format!("cannot bind metrics server on {}: {}", addr, e)))?
            .serve(make_svc);
        tokio::spawn(async move {
            if let Err(e) = server.await {
                log::error!("metrics server failed: {}", e);
            }
        });
        log::info!("metrics server started on {}", addr);
        Ok(())
    }

    /// Connects to the order feed and runs the intake loop on a blocking
    /// thread until the feed ends or `request_stop` is called.
    pub fn spawn_intake(&self) -> JoinHandle<Result<IntakeSummary>> {
        let queue = self.queue.clone();
        let stop = self.stop.clone();
        let policy = IntakePolicy::from(&self.config);
        let mut reader = OrderReader::new(
            self.config.feed_host.clone(),
            self.config.feed_port,
            self.config.read_timeout(),
        );
        let feed = format!("{}:{}", self.config.feed_host, self.config.feed_port);
        tokio::task::spawn_blocking(move || {
            log::info!("connecting to order feed at {}", feed);
            reader.connect()?;
            let summary = run_intake(&mut reader, &queue, &stop, policy);
            reader.disconnect();
            Ok(summary)
        })
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Stops intake, closes the queue and waits for the workers to drain it.
    /// Returns the number of orders the workers processed.
    pub fn stop(&mut self) -> usize {
        self.request_stop();
        self.queue.set_done();
        let processed = self.workers.take().map(WorkerPool::join).unwrap_or(0);
        log::info!(
            "server stop: {} order(s) processed, {} trade(s), {} resting order(s), mean match {:?}",
            processed,
            self.matcher.ledger().len(),
            self.matcher.order_book().len(),
            metrics::mean_latency("match_order").unwrap_or_default()
        );
        processed
    }
}
