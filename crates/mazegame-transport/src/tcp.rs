//! TCP transport: one line-framed connection per accepted socket.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::{Connection, LineConnection, Transport, TransportError};

/// A line-framed TCP connection.
pub type TcpConnection = LineConnection<OwnedReadHalf, OwnedWriteHalf>;

/// Listens for game clients.
///
/// [`shutdown`](Transport::shutdown) takes the listener away and wakes a
/// pending [`accept`](Transport::accept); the port is free once that accept
/// has returned.
pub struct TcpTransport {
    listener: Mutex<Option<Arc<TcpListener>>>,
    local_addr: SocketAddr,
    closed: Notify,
}

impl TcpTransport {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let local_addr = listener.local_addr().map_err(TransportError::AcceptFailed)?;
        info!(%local_addr, "TCP transport listening");
        Ok(Self {
            listener: Mutex::new(Some(Arc::new(listener))),
            local_addr,
            closed: Notify::new(),
        })
    }

    /// The address the listener was bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        Ok(self.local_addr)
    }

    /// `false` after [`shutdown`](Transport::shutdown).
    pub fn is_listening(&self) -> bool {
        self.listener().is_some()
    }

    fn listener(&self) -> Option<Arc<TcpListener>> {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let listener = self.listener().ok_or(TransportError::Shutdown)?;
        let accepted = tokio::select! {
            accepted = listener.accept() => Some(accepted),
            _ = self.closed.notified() => None,
        };
        let Some(accepted) = accepted else {
            return Err(TransportError::Shutdown);
        };
        let (stream, addr) = accepted.map_err(TransportError::AcceptFailed)?;
        // Lines are small and latency matters more than throughput.
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, %addr, "could not disable Nagle");
        }
        let (read, write) = stream.into_split();
        let conn = LineConnection::new(read, write, addr.to_string());
        debug!(id = %conn.id(), %addr, "accepted TCP connection");
        Ok(conn)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        let taken = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if taken.is_some() {
            info!(local_addr = %self.local_addr, "TCP transport closed");
        }
        // A stored permit is harmless: later accepts fail on the missing
        // listener before they wait.
        self.closed.notify_one();
        Ok(())
    }
}
