//! Line-framed connection over any async byte stream.

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
    DuplexStream, ReadHalf, WriteHalf,
};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, TransportError};

/// Longest line accepted from a peer, terminator excluded.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Buffer size of each direction of an in-memory pair.
const DUPLEX_BUFFER: usize = 64 * 1024;

/// A connection that reads and writes `\n`-terminated lines.
///
/// Reader and writer sit behind separate locks, so one task can block in
/// [`recv`](Connection::recv) while another keeps sending.
pub struct LineConnection<R, W> {
    id: ConnectionId,
    peer: String,
    reader: Mutex<BufReader<R>>,
    writer: Mutex<BufWriter<W>>,
}

/// One end of an in-memory connection pair.
pub type DuplexConnection = LineConnection<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

impl<R, W> LineConnection<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps a reader and a writer. `peer` is only used for logging.
    pub fn new(reader: R, writer: W, peer: impl Into<String>) -> Self {
        Self {
            id: ConnectionId::next(),
            peer: peer.into(),
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(BufWriter::new(writer)),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub async fn send_bytes(&self, data: &[u8]) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)
    }

    pub async fn flush_bytes(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .flush()
            .await
            .map_err(TransportError::SendFailed)
    }

    pub async fn recv_line(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;
        let mut buf = Vec::new();
        // Reading through `take` bounds the buffer even when a peer never
        // sends a line break.
        let mut limited = (&mut *reader).take(MAX_LINE_LENGTH as u64 + 1);
        let read = limited
            .read_until(b'\n', &mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if read == 0 {
            return Ok(None);
        }
        if buf.last() != Some(&b'\n') && buf.len() > MAX_LINE_LENGTH {
            return Err(TransportError::LineTooLong(MAX_LINE_LENGTH));
        }
        Ok(Some(buf))
    }

    pub async fn close_writer(&self) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        match writer.shutdown().await {
            Ok(()) => Ok(()),
            // Already closed by the peer or by an earlier call.
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::SendFailed(e)),
        }
    }
}

impl<R, W> Connection for LineConnection<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.send_bytes(data).await
    }

    async fn flush(&self) -> Result<(), Self::Error> {
        self.flush_bytes().await
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        self.recv_line().await
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.close_writer().await
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Creates two connected in-memory connections.
///
/// Whatever one side sends, the other side receives. Server-side bots use
/// one end while the server handler serves the other.
pub fn duplex_pair() -> (DuplexConnection, DuplexConnection) {
    let (a, b) = tokio::io::duplex(DUPLEX_BUFFER);
    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);
    (
        LineConnection::new(a_read, a_write, "memory"),
        LineConnection::new(b_read, b_write, "memory"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplex_pair_send_flush_recv() {
        let (left, right) = duplex_pair();
        left.send(b"HELO;bob\n").await.unwrap();
        left.flush().await.unwrap();
        let line = right.recv().await.unwrap().unwrap();
        assert_eq!(line, b"HELO;bob\n");
    }

    #[tokio::test]
    async fn test_recv_splits_lines() {
        let (left, right) = duplex_pair();
        left.send(b"STEP\nTURN;l\n").await.unwrap();
        left.flush().await.unwrap();
        assert_eq!(right.recv().await.unwrap().unwrap(), b"STEP\n");
        assert_eq!(right.recv().await.unwrap().unwrap(), b"TURN;l\n");
    }

    #[tokio::test]
    async fn test_recv_returns_none_after_close() {
        let (left, right) = duplex_pair();
        left.send(b"BYE!\n").await.unwrap();
        left.close().await.unwrap();
        assert_eq!(right.recv().await.unwrap().unwrap(), b"BYE!\n");
        assert!(right.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recv_rejects_overlong_line() {
        let (left, right) = duplex_pair();
        let writer = tokio::spawn(async move {
            let chunk = vec![b'x'; 1024];
            for _ in 0..=(MAX_LINE_LENGTH / 1024) {
                if left.send(&chunk).await.is_err() {
                    break;
                }
                let _ = left.flush().await;
            }
            left
        });
        let result = right.recv().await;
        assert!(matches!(result, Err(TransportError::LineTooLong(_))));
        drop(right);
        let _ = writer.await;
    }

    #[tokio::test]
    async fn test_ids_differ_between_ends() {
        let (left, right) = duplex_pair();
        assert_ne!(left.id(), right.id());
        assert_eq!(left.peer(), "memory");
    }
}
