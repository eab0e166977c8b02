use clap::Parser;
use order_matcher::config::RuntimeConfig;
use order_matcher::server::Server;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path of the TOML runtime config
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Order feed host
    #[arg(long)]
    host: Option<String>,

    /// Order feed port
    #[arg(short, long)]
    port: Option<u32>,

    /// Number of matching worker threads
    #[arg(short, long)]
    workers: Option<usize>,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::try_init().unwrap_or_default();
    let args = Args::parse();

    let mut config = RuntimeConfig::from_toml(&args.config)?;
    if let Some(host) = args.host {
        config.feed_host = host;
    }
    if let Some(port) = args.port {
        config.feed_port = port;
    }
    if let Some(workers) = args.workers {
        config.worker_threads = workers;
    }
    config.validate()?;

    let mut server = Server::builder(config);
    server.start().await?;
    let mut intake = server.spawn_intake();

    let intake_result = tokio::select! {
        _ = shutdown_signal() => {
            log::info!("shutdown requested, waiting for intake to stop");
            server.request_stop();
            (&mut intake).await
        }
        result = &mut intake => result,
    };

    let result = match intake_result? {
        Ok(summary) => {
            log::info!(
                "intake finished: {} accepted, {} skipped ({:?})",
                summary.accepted,
                summary.skipped,
                summary.exit
            );
            Ok(())
        }
        Err(e) => {
            log::error!("fatal error: {}", e);
            Err(e)
        }
    };

    let processed = tokio::task::spawn_blocking(move || server.stop()).await?;
    log::info!("disconnected from order feed, {} order(s) matched", processed);
    result.map_err(Into::into)
}
