//! Per-connection handler: one read actor and one write actor.
//!
//! The flow for each accepted connection:
//!   1. Register with the game pipeline, which greets with `MSRV` or
//!      rejects with `INFO;451`
//!   2. Write actor: drains the client's queue onto the socket, flushing
//!      at the end of each batch
//!   3. Read actor: splits the socket into lines and queues each one as a
//!      pipeline command
//!   4. Whichever side stops first ends the connection: the pipeline tears
//!      the client down, the write actor drains what is left and the socket
//!      is closed
//!
//! Server-side bots are served by the very same code over an in-memory
//! connection.

use std::sync::Arc;

use mazegame_engine::GameHandle;
use mazegame_protocol::{Codec, LineCodec, Message};
use mazegame_transport::{Connection, ConnectionId, LineConnection, TransportError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::MazeGameError;

/// Per-connection settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionOptions {
    /// Flush after every line instead of after every batch.
    pub instant_flush: bool,
    /// Set for the in-process bots.
    pub server_side: bool,
}

/// Serves one connection until either side closes it.
///
/// # Errors
/// Fails only when the game pipeline is gone before the connection could
/// be registered. Socket errors end the connection and are logged.
pub async fn handle_connection<R, W>(
    conn: LineConnection<R, W>,
    game: GameHandle,
    options: ConnectionOptions,
) -> Result<(), MazeGameError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    debug!(%conn_id, peer = conn.peer(), server_side = options.server_side, "handling new connection");

    let (outbound, queue) = mpsc::unbounded_channel();
    let accepted = game.connect(conn_id, outbound, options.server_side).await?;
    let mut writer = tokio::spawn(write_loop(Arc::clone(&conn), queue, options.instant_flush));

    let mut written = None;
    if accepted {
        tokio::select! {
            reason = read_loop(&conn, &game, conn_id) => {
                debug!(%conn_id, reason, "read side finished");
            }
            result = &mut writer => {
                debug!(%conn_id, "write side finished");
                written = Some(result);
            }
        }
        // Idempotent: a client that sent `BYE!` is already gone.
        if let Err(e) = game.disconnect(conn_id).await {
            debug!(%conn_id, error = %e, "disconnect not delivered");
        }
    }

    // The pipeline dropped the queue's sender, so the writer drains the
    // last lines (QUIT, or INFO;451) and stops.
    let result = match written {
        Some(result) => result,
        None => writer.await,
    };
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(%conn_id, error = %e, "write failed"),
        Err(e) => warn!(%conn_id, error = %e, "write task failed"),
    }

    if let Err(e) = conn.close_writer().await {
        debug!(%conn_id, error = %e, "closing connection failed");
    }
    debug!(%conn_id, "connection closed");
    Ok(())
}

/// Queues every received line. Returns why it stopped.
async fn read_loop<R, W>(
    conn: &LineConnection<R, W>,
    game: &GameHandle,
    conn_id: ConnectionId,
) -> &'static str
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    loop {
        let bytes = match conn.recv_line().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return "closed by peer",
            Err(e) => {
                debug!(%conn_id, error = %e, "receive failed");
                return "receive failed";
            }
        };
        let line = match LineCodec.decode(&bytes) {
            Ok(line) => line,
            Err(e) => {
                debug!(%conn_id, error = %e, "dropping undecodable line");
                continue;
            }
        };
        if game.submit_line(conn_id, line).is_err() {
            return "game pipeline stopped";
        }
    }
}

/// Writes queued lines until the queue closes.
///
/// Empty messages are never written; they only mark the end of a batch.
async fn write_loop<R, W>(
    conn: Arc<LineConnection<R, W>>,
    mut queue: mpsc::UnboundedReceiver<Message>,
    instant_flush: bool,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    while let Some(message) = queue.recv().await {
        if !message.is_empty() {
            conn.send_bytes(&LineCodec.encode(&message)).await?;
        }
        if message.last || instant_flush {
            conn.flush_bytes().await?;
        }
    }
    conn.flush_bytes().await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mazegame_engine::{EngineConfig, NoBots, spawn_game};
    use mazegame_maze::Maze;
    use mazegame_transport::duplex_pair;

    use super::*;

    const SQUARE: [&str; 4] = ["####", "#..#", "#..#", "####"];

    async fn line<R, W>(conn: &LineConnection<R, W>) -> Option<String>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let bytes = conn.recv_line().await.unwrap()?;
        Some(LineCodec.decode(&bytes).unwrap())
    }

    async fn send<R, W>(conn: &LineConnection<R, W>, text: &str)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        conn.send_bytes(&LineCodec.encode(&Message::new(text))).await.unwrap();
        conn.flush_bytes().await.unwrap();
    }

    fn game(max_clients: usize) -> GameHandle {
        let config = EngineConfig {
            max_clients,
            seed: Some(1),
            ..EngineConfig::default()
        };
        spawn_game(Maze::from_lines(&SQUARE), config, Arc::new(NoBots))
    }

    #[tokio::test]
    async fn test_handle_connection_login_and_bye() {
        let game = game(4);
        let (server, client) = duplex_pair();
        let task = tokio::spawn(handle_connection(server, game.clone(), ConnectionOptions::default()));

        assert_eq!(line(&client).await.as_deref(), Some("MSRV;1"));
        send(&client, "HELO;bob").await;
        assert_eq!(line(&client).await.as_deref(), Some("WELC;1"));
        send(&client, "BYE!").await;
        assert_eq!(line(&client).await.as_deref(), Some("QUIT"));
        assert_eq!(line(&client).await, None);

        task.await.unwrap().unwrap();
        assert_eq!(game.server_info().await.unwrap().connected_clients, 0);
    }

    #[tokio::test]
    async fn test_handle_connection_peer_close_removes_client() {
        let game = game(4);
        let (server, client) = duplex_pair();
        let task = tokio::spawn(handle_connection(server, game.clone(), ConnectionOptions::default()));

        line(&client).await;
        send(&client, "HELO;bob").await;
        line(&client).await;
        drop(client);

        task.await.unwrap().unwrap();
        assert_eq!(game.server_info().await.unwrap().connected_clients, 0);
    }

    #[tokio::test]
    async fn test_handle_connection_full_server_rejects() {
        let game = game(1);
        let (first_server, first) = duplex_pair();
        tokio::spawn(handle_connection(first_server, game.clone(), ConnectionOptions::default()));
        line(&first).await;
        send(&first, "HELO;alice").await;
        line(&first).await;

        let (server, client) = duplex_pair();
        let task = tokio::spawn(handle_connection(server, game.clone(), ConnectionOptions::default()));
        assert_eq!(line(&client).await.as_deref(), Some("INFO;451"));
        assert_eq!(line(&client).await, None);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_handle_connection_crlf_lines_accepted() {
        let game = game(4);
        let (server, client) = duplex_pair();
        tokio::spawn(handle_connection(server, game, ConnectionOptions::default()));

        line(&client).await;
        client.send_bytes(b"HELO;carol\r\n").await.unwrap();
        client.flush_bytes().await.unwrap();
        assert_eq!(line(&client).await.as_deref(), Some("WELC;1"));
    }

    #[tokio::test]
    async fn test_handle_connection_after_shutdown_fails() {
        let game = game(4);
        game.shutdown().await.unwrap();
        let (server, _client) = duplex_pair();
        let result = handle_connection(server, game, ConnectionOptions::default()).await;
        assert!(matches!(result, Err(MazeGameError::Game(_))));
    }
}
