//! TCP transport integration tests against a local listener.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use lumen_transport::{TcpTransport, TcpTransportConfig, Transport, TransportEvent};

async fn local_listener() -> (TcpListener, TcpTransportConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, TcpTransportConfig::new(addr, b'\r'))
}

#[tokio::test]
async fn test_connect_and_send() {
    let (listener, config) = local_listener().await;
    let (mut transport, mut events) = TcpTransport::new(config);

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 64];
        let n = socket.read(&mut buf).await.unwrap();
        buf.truncate(n);
        buf
    });

    transport.connect().await.unwrap();
    assert!(transport.is_connected());
    assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));

    transport.send(Bytes::from_static(b"POWR ON\r")).await.unwrap();

    let received = server.await.unwrap();
    assert_eq!(received, b"POWR ON\r");
}

#[tokio::test]
async fn test_inbound_frames_are_split_on_delimiter() {
    let (listener, config) = local_listener().await;
    let (mut transport, mut events) = TcpTransport::new(config);

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // Two frames in one write, plus a partial third held back.
        socket.write_all(b"OK ON\rAVOL 42\rAMU").await.unwrap();
        socket.write_all(b"T OFF\r").await.unwrap();
        // Keep the socket open while the client reads.
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    transport.connect().await.unwrap();
    assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));

    let mut frames = Vec::new();
    while frames.len() < 3 {
        match tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("timed out waiting for frame")
        {
            Some(TransportEvent::Frame(frame)) => frames.push(frame),
            other => panic!("expected frame event, got {other:?}"),
        }
    }

    assert_eq!(frames[0].as_ref(), b"OK ON");
    assert_eq!(frames[1].as_ref(), b"AVOL 42");
    assert_eq!(frames[2].as_ref(), b"AMUT OFF");
}

#[tokio::test]
async fn test_peer_close_emits_disconnected() {
    let (listener, config) = local_listener().await;
    let (mut transport, mut events) = TcpTransport::new(config);

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);
    });

    transport.connect().await.unwrap();
    assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));

    match tokio::time::timeout(Duration::from_secs(1), events.recv()).await {
        Ok(Some(TransportEvent::Disconnected)) => {}
        other => panic!("expected disconnect event, got {other:?}"),
    }
    assert!(!transport.is_connected());
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (listener, config) = local_listener().await;
    let (mut transport, mut events) = TcpTransport::new(config);

    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    transport.connect().await.unwrap();
    assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));

    transport.close().await.unwrap();
    assert!(!transport.is_connected());
    transport.close().await.unwrap();
}
