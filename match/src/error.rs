//! Error types shared by the feed reader, the intake queue and the service wiring.
//!
//! The matcher itself never fails for well-formed input: only pre-validated
//! orders reach it, so every variant here belongs to the edges of the system.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid settings, e.g. a feed port outside 1..=65535
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Address resolution, connect or socket failure
    #[error("connection error: {0}")]
    Connection(String),

    /// Malformed record or a record breaking a business rule
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No complete record arrived before the read deadline
    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    /// The remote end closed the stream
    #[error("connection closed by peer")]
    PeerClosed,

    /// `pop` on an empty queue that has been marked done, or `add` after closure
    #[error("intake queue is closed")]
    QueueClosed,
}

impl Error {
    /// Errors after which the feed connection cannot be used any more.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::Connection(_) | Error::PeerClosed | Error::QueueClosed
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
