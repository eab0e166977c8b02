use crate::engine::entry::Order;
use crate::error::{Error, Result};
use crate::feed::intake::OrderSource;
use crate::feed::parser::parse_order;
use std::io::{self, BufRead, BufReader, Read};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest record accepted from the feed, newline included.
pub const MAX_RECORD_LEN: usize = 1024;

/// Client for the newline-framed order feed.
///
/// One outbound TCP stream per reader. Reads are bounded by `read_timeout`;
/// a timeout is reported to the caller and never retried here. Bytes of a
/// record that was only partly received when the deadline hit are kept and
/// completed by the next read. Connecting is bounded by the same timeout.
///
/// A record longer than `MAX_RECORD_LEN` is reported once as a protocol error
/// and the rest of it is dropped up to its newline.
#[derive(Debug)]
pub struct OrderReader {
    host: String,
    port: u32,
    read_timeout: Duration,
    stream: Option<BufReader<TcpStream>>,
    pending: Vec<u8>,
    overlong: bool,
}

impl OrderReader {
    pub fn new(host: impl Into<String>, port: u32, read_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            read_timeout,
            stream: None,
            pending: Vec::new(),
            overlong: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn connect(&mut self) -> Result<()> {
        let port = u16::try_from(self.port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| Error::Configuration(format!("invalid port number: {}", self.port)))?;
        if self.stream.is_some() {
            return Err(Error::Connection("already connected".to_string()));
        }

        let addrs = (self.host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| Error::Connection(format!("cannot resolve {}:{}: {}", self.host, port, e)))?;
        let mut last_error = None;
        let mut connected = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.read_timeout) {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(e) => {
                    log::debug!("connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }
        let stream = connected.ok_or_else(|| {
            let reason = last_error.map_or_else(|| "no address resolved".to_string(), |e| e.to_string());
            Error::Connection(format!("connection to {}:{} failed: {}", self.host, port, reason))
        })?;
        stream
            .set_read_timeout(Some(self.read_timeout))
            .map_err(|e| Error::Connection(format!("cannot set read timeout: {}", e)))?;

        log::info!("connected to order feed at {}:{}", self.host, port);
        self.pending.clear();
        self.overlong = false;
        self.stream = Some(BufReader::new(stream));
        Ok(())
    }

    /// Reads and validates the next record.
    pub fn read_next_order(&mut self) -> Result<Order> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::Connection("not connected".to_string()))?;

        loop {
            let room = (MAX_RECORD_LEN - self.pending.len()) as u64;
            match stream.by_ref().take(room).read_until(b'\n', &mut self.pending) {
                Ok(_) if self.pending.last() == Some(&b'\n') => {
                    if !self.overlong {
                        break;
                    }
                    // tail of a record already reported
                    self.overlong = false;
                    self.pending.clear();
                }
                Ok(_) if self.pending.len() >= MAX_RECORD_LEN => {
                    self.pending.clear();
                    if !self.overlong {
                        self.overlong = true;
                        return Err(Error::Protocol(format!(
                            "record exceeds {} bytes",
                            MAX_RECORD_LEN
                        )));
                    }
                }
                // read_until only stops short of the delimiter at end of stream
                Ok(_) => return Err(Error::PeerClosed),
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    return Err(Error::Timeout(self.read_timeout));
                }
                Err(e) => return Err(Error::Connection(format!("read error: {}", e))),
            }
        }

        let record = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&record);
        parse_order(&line)
    }

    /// Graceful close. Does nothing when not connected.
    pub fn disconnect(&mut self) {
        let Some(reader) = self.stream.take() else {
            return;
        };
        self.pending.clear();
        self.overlong = false;
        let stream = reader.into_inner();
        if let Err(e) = stream.shutdown(Shutdown::Both) {
            log::warn!("error during socket shutdown: {}", e);
        }
        log::info!("disconnected from order feed at {}:{}", self.host, self.port);
    }
}

impl OrderSource for OrderReader {
    fn read_next_order(&mut self) -> Result<Order> {
        OrderReader::read_next_order(self)
    }
}

impl Drop for OrderReader {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::entry::OrderSide;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Instant;

    /// Serves `chunks` to the first client, pausing `gap` between chunks.
    fn feed<S: AsRef<str> + Send + 'static>(chunks: Vec<S>, gap: Duration) -> (u32, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port() as u32;
        let handle = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            for chunk in chunks {
                conn.write_all(chunk.as_ref().as_bytes()).unwrap();
                conn.flush().unwrap();
                thread::sleep(gap);
            }
        });
        (port, handle)
    }

    #[test]
    fn test_port_out_of_range_is_configuration_error() {
        for port in [0, 65536, 100_000] {
            let mut reader = OrderReader::new("127.0.0.1", port, DEFAULT_READ_TIMEOUT);
            assert!(matches!(reader.connect(), Err(Error::Configuration(_))));
            assert!(!reader.is_connected());
        }
    }

    #[test]
    fn test_connect_refused_is_connection_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port() as u32
        };
        let mut reader = OrderReader::new("127.0.0.1", port, DEFAULT_READ_TIMEOUT);
        assert!(matches!(reader.connect(), Err(Error::Connection(_))));
    }

    #[test]
    fn test_unreachable_host_fails_within_timeout() {
        let timeout = Duration::from_millis(200);
        let mut reader = OrderReader::new("10.255.255.1", 9000, timeout);
        let started = Instant::now();
        assert!(matches!(reader.connect(), Err(Error::Connection(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!reader.is_connected());
    }

    #[test]
    fn test_read_without_connect_fails() {
        let mut reader = OrderReader::new("127.0.0.1", 9000, DEFAULT_READ_TIMEOUT);
        assert!(matches!(reader.read_next_order(), Err(Error::Connection(_))));
    }

    #[test]
    fn test_reads_records_then_peer_close() {
        let (port, server) = feed(
            vec!["BUY,10.5,3,1,100\nSELL,11,2,2,101\n", "BUY,bad\n"],
            Duration::from_millis(10),
        );
        let mut reader = OrderReader::new("127.0.0.1", port, DEFAULT_READ_TIMEOUT);
        reader.connect().unwrap();
        assert!(matches!(reader.connect(), Err(Error::Connection(_))));

        let first = reader.read_next_order().unwrap();
        assert_eq!((first.side, first.price, first.id), (OrderSide::Buy, dec!(10.5), 1));
        let second = reader.read_next_order().unwrap();
        assert_eq!((second.side, second.quantity, second.id), (OrderSide::Sell, dec!(2), 2));
        assert!(matches!(reader.read_next_order(), Err(Error::Protocol(_))));

        server.join().unwrap();
        assert!(matches!(reader.read_next_order(), Err(Error::PeerClosed)));
    }

    #[test]
    fn test_timeout_keeps_partial_record() {
        let (port, server) = feed(vec!["SELL,20,5", "0,9,1\n"], Duration::from_millis(300));
        let mut reader = OrderReader::new("127.0.0.1", port, Duration::from_millis(100));
        reader.connect().unwrap();

        let mut timeouts = 0;
        let order = loop {
            match reader.read_next_order() {
                Ok(order) => break order,
                Err(Error::Timeout(_)) => timeouts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        };
        assert!(timeouts >= 1);
        assert_eq!(order.quantity, dec!(50));
        assert_eq!(order.id, 9);
        server.join().unwrap();
    }

    #[test]
    fn test_overlong_record_is_rejected_and_skipped() {
        let flood = format!("{}\nBUY,10,1,4,100\n", "A".repeat(MAX_RECORD_LEN * 2));
        let (port, server) = feed(vec![flood], Duration::from_millis(200));
        let mut reader = OrderReader::new("127.0.0.1", port, DEFAULT_READ_TIMEOUT);
        reader.connect().unwrap();

        match reader.read_next_order() {
            Err(Error::Protocol(msg)) => assert!(msg.contains("exceeds")),
            other => panic!("expected protocol error, got {:?}", other),
        }
        let order = reader.read_next_order().unwrap();
        assert_eq!((order.side, order.id), (OrderSide::Buy, 4));

        server.join().unwrap();
        assert!(matches!(reader.read_next_order(), Err(Error::PeerClosed)));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (port, server) = feed(Vec::<&str>::new(), Duration::from_millis(0));
        let mut reader = OrderReader::new("localhost", port, DEFAULT_READ_TIMEOUT);
        reader.disconnect();
        reader.connect().unwrap();
        assert!(reader.is_connected());
        reader.disconnect();
        reader.disconnect();
        assert!(!reader.is_connected());
        assert!(matches!(reader.read_next_order(), Err(Error::Connection(_))));
        server.join().unwrap();
    }
}
