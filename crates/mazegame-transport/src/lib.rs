//! Line transport for the maze game.
//!
//! The game speaks newline-terminated text. [`LineConnection`] frames any
//! `AsyncRead`/`AsyncWrite` pair into lines, [`TcpTransport`] hands them out
//! for accepted sockets and [`duplex_pair`] builds an in-memory pair for the
//! server-side bots. The [`Transport`] and [`Connection`] traits are the
//! seam the server is written against.

#![allow(async_fn_in_trait)]

mod error;
mod line;
mod tcp;

pub use error::TransportError;
pub use line::{DuplexConnection, LineConnection, MAX_LINE_LENGTH, duplex_pair};
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique id of a connection, TCP or in-memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Source of incoming connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next connection. Fails once the transport is shut
    /// down.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops accepting. A pending or later [`accept`](Self::accept) returns
    /// an error and the listening socket is released.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A peer that exchanges lines.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Queues bytes; they reach the peer on [`flush`](Self::flush).
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    async fn flush(&self) -> Result<(), Self::Error>;

    /// Next line including its terminator, `None` once the peer closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Flushes and closes the sending side.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
