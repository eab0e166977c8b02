//! Order feed simulator.
//!
//! Listens for order-matcher clients and streams random
//! `SIDE,PRICE,QUANTITY,ID,TIMESTAMP` records to each of them.

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    addr: String,

    /// Delay between records in ms
    #[arg(short, long, default_value = "1000")]
    interval_ms: u64,

    /// Records sent per client before closing; 0 streams until the client leaves
    #[arg(short, long, default_value = "0")]
    count: u64,
}

fn generate_order_line(rng: &mut StdRng) -> String {
    let side = if rng.gen_bool(0.5) { "BUY" } else { "SELL" };
    let price = Decimal::new(rng.gen_range(1_000..=20_000), 2);
    let quantity = Decimal::new(rng.gen_range(100..=10_000), 2);
    let order_id: u64 = rng.gen_range(1000..=9999);
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{},{},{},{},{}\n", side, price, quantity, order_id, timestamp)
}

async fn serve_client(mut conn: TcpStream, interval: Duration, count: u64) -> std::io::Result<()> {
    let mut rng = StdRng::from_entropy();
    let mut sent = 0u64;
    while count == 0 || sent < count {
        let line = generate_order_line(&mut rng);
        log::info!("sending: {}", line.trim_end());
        conn.write_all(line.as_bytes()).await?;
        sent += 1;
        sleep(interval).await;
    }
    conn.shutdown().await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::try_init().unwrap_or_default();
    let args = Args::parse();

    let listener = TcpListener::bind(&args.addr).await?;
    log::info!("feed server listening on {}", args.addr);

    loop {
        let (conn, peer) = listener.accept().await?;
        log::info!("connected by {}", peer);
        let interval = Duration::from_millis(args.interval_ms);
        let count = args.count;
        tokio::spawn(async move {
            if let Err(e) = serve_client(conn, interval, count).await {
                log::warn!("client {} dropped: {}", peer, e);
            }
        });
    }
}
