//! Integration tests for the TCP transport.
//!
//! These tests spin up a real listener and a plain `TcpStream` client to
//! verify that lines actually flow over the network.

use mazegame_transport::{Connection, TcpTransport, Transport, TransportError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::test]
async fn test_tcp_accept_and_exchange_lines() {
    // Port 0 lets the OS pick a free port; `local_addr` tells us which.
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.expect("should bind");
    let addr = transport.local_addr().unwrap();

    let server_handle = tokio::spawn(async move { transport.accept().await.expect("should accept") });

    let client = TcpStream::connect(addr).await.expect("client should connect");
    let server_conn = server_handle.await.expect("task should complete");
    assert!(server_conn.id().to_string().starts_with('c'));

    let (read, mut write) = client.into_split();
    let mut client_reader = BufReader::new(read);

    // --- Server sends, client receives ---
    server_conn.send(b"MSRV;1\n").await.unwrap();
    server_conn.flush().await.unwrap();
    let mut line = String::new();
    client_reader.read_line(&mut line).await.unwrap();
    assert_eq!(line, "MSRV;1\n");

    // --- Client sends, server receives ---
    write.write_all(b"HELO;bob\r\n").await.unwrap();
    let received = server_conn.recv().await.unwrap().expect("should have data");
    assert_eq!(received, b"HELO;bob\r\n");

    server_conn.close().await.expect("close should succeed");
}

#[tokio::test]
async fn test_tcp_recv_returns_none_on_client_close() {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();
    let server_handle = tokio::spawn(async move { transport.accept().await.unwrap() });

    let client = TcpStream::connect(addr).await.unwrap();
    let server_conn = server_handle.await.unwrap();
    drop(client);

    let result = server_conn.recv().await.expect("recv should not error");
    assert!(result.is_none(), "should return None on client close");
}

#[tokio::test]
async fn test_tcp_send_is_buffered_until_flush() {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();
    let server_handle = tokio::spawn(async move { transport.accept().await.unwrap() });

    let client = TcpStream::connect(addr).await.unwrap();
    let server_conn = server_handle.await.unwrap();
    let mut reader = BufReader::new(client);

    server_conn.send(b"JOIN;1;bob\n").await.unwrap();
    server_conn.send(b"PSCO;1;0\n").await.unwrap();
    server_conn.flush().await.unwrap();

    let mut first = String::new();
    let mut second = String::new();
    reader.read_line(&mut first).await.unwrap();
    reader.read_line(&mut second).await.unwrap();
    assert_eq!(first, "JOIN;1;bob\n");
    assert_eq!(second, "PSCO;1;0\n");
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_tcp_shutdown_fails_accept_and_frees_port() {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();
    assert!(transport.is_listening());

    transport.shutdown().await.unwrap();
    assert!(!transport.is_listening());
    assert!(matches!(transport.accept().await, Err(TransportError::Shutdown)));

    // The listener is gone, so nobody answers on the port any more.
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_tcp_shutdown_twice_is_harmless() {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
    transport.shutdown().await.unwrap();
    transport.shutdown().await.unwrap();
    assert!(matches!(transport.accept().await, Err(TransportError::Shutdown)));
}
