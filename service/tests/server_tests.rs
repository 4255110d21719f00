//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests for the frameline-service crate over real TCP sockets

use bytes::Bytes;
use frameline_service::{
    CodecError, Connection, ConnectionId, FramingStrategy, Server, ServerConfig, ServerError,
};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, timeout};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum Event {
    Connected(Connection),
    Message(ConnectionId, Bytes),
    Closed(ConnectionId, ServerError),
}

/// Register callbacks that forward every event to a channel
fn record_events(server: &mut Server) -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    let on_client = tx.clone();
    let on_message = tx.clone();
    let on_closed = tx;

    server
        .on_new_client(move |conn| {
            let tx = on_client.clone();
            async move {
                let _ = tx.send(Event::Connected(conn));
            }
        })
        .on_new_message(move |conn, message| {
            let tx = on_message.clone();
            async move {
                let _ = tx.send(Event::Message(conn.id(), message));
            }
        })
        .on_client_connection_closed(move |conn, error| {
            let tx = on_closed.clone();
            async move {
                let _ = tx.send(Event::Closed(conn.id(), error));
            }
        });
    rx
}

/// Bind on an ephemeral port and run the accept loop in the background
async fn start(server: Server, strategy: FramingStrategy) -> SocketAddr {
    let listener = server.bind(strategy).await.unwrap();
    let addr = listener.local_addr();
    tokio::spawn(listener.serve());
    addr
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn expect_connected(events: &mut mpsc::UnboundedReceiver<Event>) -> Connection {
    match next_event(events).await {
        Event::Connected(conn) => conn,
        other => panic!("expected Connected, got {other:?}"),
    }
}

async fn expect_message(events: &mut mpsc::UnboundedReceiver<Event>) -> (ConnectionId, Bytes) {
    match next_event(events).await {
        Event::Message(id, message) => (id, message),
        other => panic!("expected Message, got {other:?}"),
    }
}

async fn expect_closed(events: &mut mpsc::UnboundedReceiver<Event>) -> (ConnectionId, ServerError) {
    match next_event(events).await {
        Event::Closed(id, error) => (id, error),
        other => panic!("expected Closed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_delimiter_messages_and_peer_close() {
    let mut server = Server::new("127.0.0.1:0");
    let mut events = record_events(&mut server);
    let addr = start(server, FramingStrategy::Delimiter).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    let conn = expect_connected(&mut events).await;
    assert!(!conn.is_tls());

    client.write_all(b"hello\nwor").await.unwrap();
    client.write_all(b"ld\n").await.unwrap();

    let (id, message) = expect_message(&mut events).await;
    assert_eq!(id, conn.id());
    assert_eq!(message, Bytes::from("hello\n"));
    let (_, message) = expect_message(&mut events).await;
    assert_eq!(message, Bytes::from("world\n"));

    drop(client);
    let (id, error) = expect_closed(&mut events).await;
    assert_eq!(id, conn.id());
    assert!(matches!(error, ServerError::PeerClosed));
    assert!(conn.is_closed());
    assert_eq!(conn.messages_received(), 2);
    assert_eq!(conn.bytes_received(), 12);
}

#[tokio::test]
async fn test_echo_with_send_from_callback() {
    let mut server = Server::new("127.0.0.1:0");
    server
        .on_new_client(|conn| async move {
            let _ = conn.send("welcome\n").await;
        })
        .on_new_message(|conn, message| async move {
            let _ = conn.send_bytes(&message).await;
        });
    let addr = start(server, FramingStrategy::Delimiter).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    let mut greeting = [0u8; 8];
    client.read_exact(&mut greeting).await.unwrap();
    assert_eq!(&greeting, b"welcome\n");

    client.write_all(b"ping\npong\n").await.unwrap();
    let mut echoed = [0u8; 10];
    timeout(EVENT_TIMEOUT, client.read_exact(&mut echoed))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&echoed, b"ping\npong\n");
}

#[tokio::test]
async fn test_length_prefixed_messages() {
    let mut server = Server::new("127.0.0.1:0");
    let mut events = record_events(&mut server);
    let addr = start(server, FramingStrategy::LengthPrefixed).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    expect_connected(&mut events).await;

    client
        .write_all(b"\x00\x00\x00\x03abc\x00\x00\x00\x00\x00\x00")
        .await
        .unwrap();
    client.write_all(b"\x00\x02hi").await.unwrap();

    let (_, message) = expect_message(&mut events).await;
    assert_eq!(message, Bytes::from("abc"));
    let (_, message) = expect_message(&mut events).await;
    assert!(message.is_empty());
    let (_, message) = expect_message(&mut events).await;
    assert_eq!(message, Bytes::from("hi"));
}

#[tokio::test]
async fn test_send_frame_uses_listener_strategy() {
    let mut server = Server::new("127.0.0.1:0");
    server.on_new_message(|conn, message| async move {
        let _ = conn.send_frame(&message).await;
    });
    let addr = start(server, FramingStrategy::LengthPrefixed).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"\x00\x00\x00\x04echo").await.unwrap();

    let mut reply = [0u8; 8];
    timeout(EVENT_TIMEOUT, client.read_exact(&mut reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&reply, b"\x00\x00\x00\x04echo");
}

#[tokio::test]
async fn test_negative_length_closes_only_that_connection() {
    let mut server = Server::new("127.0.0.1:0");
    let mut events = record_events(&mut server);
    let addr = start(server, FramingStrategy::LengthPrefixed).await;

    let mut healthy = TcpStream::connect(addr).await.unwrap();
    let healthy_conn = expect_connected(&mut events).await;
    let mut broken = TcpStream::connect(addr).await.unwrap();
    let broken_conn = expect_connected(&mut events).await;

    broken.write_all(&(-1i32).to_be_bytes()).await.unwrap();
    let (id, error) = expect_closed(&mut events).await;
    assert_eq!(id, broken_conn.id());
    assert!(matches!(
        error,
        ServerError::Stream(CodecError::NegativeLength(-1))
    ));

    healthy.write_all(b"\x00\x00\x00\x02ok").await.unwrap();
    let (id, message) = expect_message(&mut events).await;
    assert_eq!(id, healthy_conn.id());
    assert_eq!(message, Bytes::from("ok"));
    assert!(!healthy_conn.is_closed());
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let mut server = Server::new("127.0.0.1:0").with_max_frame_length(Some(8));
    let mut events = record_events(&mut server);
    let addr = start(server, FramingStrategy::Delimiter).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    expect_connected(&mut events).await;

    client.write_all(b"0123456789abcdef\n").await.unwrap();
    let (_, error) = expect_closed(&mut events).await;
    assert!(matches!(
        error,
        ServerError::Stream(CodecError::FrameTooLarge { max: 8, .. })
    ));
}

#[tokio::test]
async fn test_truncated_frame_at_eof() {
    let mut server = Server::new("127.0.0.1:0");
    let mut events = record_events(&mut server);
    let addr = start(server, FramingStrategy::Delimiter).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    expect_connected(&mut events).await;

    client.write_all(b"partial").await.unwrap();
    client.shutdown().await.unwrap();

    let (_, error) = expect_closed(&mut events).await;
    assert!(matches!(
        error,
        ServerError::Stream(CodecError::Truncated { buffered: 7 })
    ));
}

#[tokio::test]
async fn test_messages_arrive_in_stream_order() {
    let mut server = Server::new("127.0.0.1:0");
    let mut events = record_events(&mut server);
    let addr = start(server, FramingStrategy::Delimiter).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    expect_connected(&mut events).await;

    let mut payload = Vec::new();
    for i in 0..200 {
        payload.extend_from_slice(format!("line-{i}\n").as_bytes());
    }
    client.write_all(&payload).await.unwrap();

    for i in 0..200 {
        let (_, message) = expect_message(&mut events).await;
        assert_eq!(message, Bytes::from(format!("line-{i}\n")));
    }
}

#[tokio::test]
async fn test_multiple_connections_get_distinct_ids() {
    let mut server = Server::new("127.0.0.1:0");
    let mut events = record_events(&mut server);
    let addr = start(server, FramingStrategy::Delimiter).await;

    let mut clients = Vec::new();
    let mut ids = Vec::new();
    for _ in 0..3 {
        clients.push(TcpStream::connect(addr).await.unwrap());
        ids.push(expect_connected(&mut events).await.id());
    }
    ids.sort_by_key(ConnectionId::as_u64);
    ids.dedup();
    assert_eq!(ids.len(), 3);

    for client in &mut clients {
        client.write_all(b"hi\n").await.unwrap();
    }
    for _ in 0..3 {
        let (id, message) = expect_message(&mut events).await;
        assert!(ids.contains(&id));
        assert_eq!(message, Bytes::from("hi\n"));
    }
}

#[tokio::test]
async fn test_close_from_callback() {
    let mut server = Server::new("127.0.0.1:0");
    let mut events = record_events(&mut server);
    server.on_new_message(|conn, message| async move {
        if message.as_ref() == b"quit\n" {
            let _ = conn.close().await;
        }
    });
    let addr = start(server, FramingStrategy::Delimiter).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    let conn = expect_connected(&mut events).await;
    client.write_all(b"quit\n").await.unwrap();

    let (id, error) = expect_closed(&mut events).await;
    assert_eq!(id, conn.id());
    assert!(matches!(error, ServerError::Closed));

    let mut rest = Vec::new();
    let read = timeout(EVENT_TIMEOUT, client.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, 0);
}

#[tokio::test]
async fn test_send_after_close_fails_without_callback() {
    let mut server = Server::new("127.0.0.1:0");
    let mut events = record_events(&mut server);
    let addr = start(server, FramingStrategy::Delimiter).await;

    let client = TcpStream::connect(addr).await.unwrap();
    let conn = expect_connected(&mut events).await;
    drop(client);
    let (_, error) = expect_closed(&mut events).await;
    assert!(matches!(error, ServerError::PeerClosed));

    let result = conn.send("too late\n").await;
    assert!(matches!(result, Err(ServerError::Closed)));
    assert!(matches!(conn.close().await, Err(ServerError::Closed)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_bind_conflict_is_startup_error() {
    let first = Server::new("127.0.0.1:0")
        .bind(FramingStrategy::Delimiter)
        .await
        .unwrap();
    let taken = first.local_addr().to_string();

    let err = Server::new(taken.clone())
        .bind(FramingStrategy::Delimiter)
        .await
        .unwrap_err();
    assert!(err.is_startup_error());
    assert!(matches!(err, ServerError::Bind { address, .. } if address == taken));
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let err = Server::from_config(ServerConfig::new(""))
        .listen(FramingStrategy::Delimiter)
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::Config(_)));
}

#[tokio::test]
async fn test_serve_with_shutdown() {
    let listener = Server::new("127.0.0.1:0")
        .bind(FramingStrategy::LengthPrefixed)
        .await
        .unwrap();
    assert_eq!(listener.strategy(), FramingStrategy::LengthPrefixed);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(listener.serve_with_shutdown(async move {
        let _ = stop_rx.await;
    }));

    stop_tx.send(()).unwrap();
    let result = timeout(EVENT_TIMEOUT, task).await.unwrap().unwrap();
    assert!(result.is_ok());
}
