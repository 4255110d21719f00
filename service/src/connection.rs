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

//! Connection handle shared between the read loop and application code

use crate::{ConnectionId, Result, ServerError, ServerHandler};
use bytes::BytesMut;
use frameline_codec::FrameCodec;
use metrics::{counter, gauge};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::select;
use tokio::sync::Mutex;
use tokio_util::codec::Encoder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

/// Any byte stream a connection can run over (plain TCP or TLS)
pub(crate) trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

pub(crate) type BoxedTransport = Box<dyn Transport>;
pub(crate) type TransportReader = ReadHalf<BoxedTransport>;
type TransportWriter = WriteHalf<BoxedTransport>;

/// Upper bound on flushing a transport shutdown (a TLS close_notify can stall
/// behind a peer that stopped reading)
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A client connection accepted by the server
///
/// `Connection` is a cheap, cloneable handle. The read half of the transport
/// belongs to the connection's worker task; this handle owns the write half,
/// so [`send`](Self::send) may be called from any task, including from inside
/// a handler callback.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    id: ConnectionId,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    tls: bool,
    created_at: Instant,

    writer: Mutex<Option<TransportWriter>>,
    codec: FrameCodec,
    handler: Arc<dyn ServerHandler>,

    // Cancelled once the transport is closed, for any reason
    cancel: CancellationToken,
    // First failure seen on the connection; reported by the worker
    close_reason: OnceLock<ServerError>,
    close_reported: AtomicBool,

    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    messages_received: AtomicU64,
}

impl Connection {
    /// Wrap a transport, returning the handle and the read half for the worker
    pub(crate) fn new(
        id: ConnectionId,
        transport: BoxedTransport,
        peer_addr: SocketAddr,
        local_addr: SocketAddr,
        tls: bool,
        codec: FrameCodec,
        handler: Arc<dyn ServerHandler>,
    ) -> (Self, TransportReader) {
        let (reader, writer) = tokio::io::split(transport);

        counter!("frameline.connections.total").increment(1);
        gauge!("frameline.connections.active").increment(1.0);

        let connection = Self {
            inner: Arc::new(ConnectionInner {
                id,
                peer_addr,
                local_addr,
                tls,
                created_at: Instant::now(),
                writer: Mutex::new(Some(writer)),
                codec,
                handler,
                cancel: CancellationToken::new(),
                close_reason: OnceLock::new(),
                close_reported: AtomicBool::new(false),
                bytes_sent: AtomicU64::new(0),
                bytes_received: AtomicU64::new(0),
                messages_received: AtomicU64::new(0),
            }),
        };
        (connection, reader)
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.peer_addr
    }

    /// Get the local address the connection was accepted on
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Whether the connection negotiated TLS
    pub fn is_tls(&self) -> bool {
        self.inner.tls
    }

    /// Get when the connection was accepted
    pub fn created_at(&self) -> Instant {
        self.inner.created_at
    }

    /// Whether the transport has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Get bytes sent
    pub fn bytes_sent(&self) -> u64 {
        self.inner.bytes_sent.load(Ordering::Relaxed)
    }

    /// Get payload bytes received
    pub fn bytes_received(&self) -> u64 {
        self.inner.bytes_received.load(Ordering::Relaxed)
    }

    /// Get messages received
    pub fn messages_received(&self) -> u64 {
        self.inner.messages_received.load(Ordering::Relaxed)
    }

    /// Send a text message as raw bytes
    pub async fn send(&self, message: &str) -> Result<()> {
        self.send_bytes(message.as_bytes()).await
    }

    /// Write raw bytes to the peer
    ///
    /// No framing is applied. If the write fails the transport is closed and
    /// the error is returned; the connection-closed callback then receives the
    /// same error once the connection's current callback (if any) returns.
    /// A send that is still blocked when the connection closes, and any send
    /// on a connection that is already closed, returns [`ServerError::Closed`].
    #[instrument(skip(self, bytes), fields(connection_id = %self.inner.id, len = bytes.len()))]
    pub async fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        let result = {
            let mut writer = self.inner.writer.lock().await;
            let Some(writer) = writer.as_mut() else {
                return Err(ServerError::Closed);
            };
            select! {
                biased;
                _ = self.inner.cancel.cancelled() => {
                    trace!("Send abandoned, connection closing");
                    return Err(ServerError::Closed);
                }
                result = async {
                    match writer.write_all(bytes).await {
                        Ok(()) => writer.flush().await,
                        Err(err) => Err(err),
                    }
                } => result,
            }
        };

        match result {
            Ok(()) => {
                self.inner
                    .bytes_sent
                    .fetch_add(bytes.len() as u64, Ordering::Relaxed);
                counter!("frameline.bytes.sent").increment(bytes.len() as u64);
                trace!("Bytes sent");
                Ok(())
            }
            Err(err) => {
                counter!("frameline.errors.send").increment(1);
                debug!(error = %err, "Send failed, closing connection");
                let error = ServerError::Send(Arc::new(err));
                self.record_failure(error.clone());
                // The write already failed; a shutdown error adds nothing.
                let _ = self.shutdown_transport().await;
                Err(error)
            }
        }
    }

    /// Frame a payload with the listener's strategy and send it
    ///
    /// Length-prefixed listeners prepend the 4-byte length; delimiter
    /// listeners append a newline unless the payload already ends with one.
    pub async fn send_frame(&self, payload: &[u8]) -> Result<()> {
        let mut codec = self.inner.codec.clone();
        let mut buffer = BytesMut::new();
        codec
            .encode(payload, &mut buffer)
            .map_err(ServerError::Encode)?;
        self.send_bytes(&buffer).await
    }

    /// Close the transport
    ///
    /// This does not invoke the connection-closed callback directly; the
    /// connection's read loop observes the closure and reports
    /// [`ServerError::Closed`].
    pub async fn close(&self) -> Result<()> {
        match self.shutdown_transport().await {
            Some(Ok(())) => Ok(()),
            Some(Err(err)) => Err(ServerError::Close(Arc::new(err))),
            None => Err(ServerError::Closed),
        }
    }

    /// Cancel the read loop and shut the write half down
    ///
    /// A send blocked on a stalled peer observes the cancellation and releases
    /// the writer. Returns `None` if the transport was already closed.
    pub(crate) async fn shutdown_transport(&self) -> Option<std::io::Result<()>> {
        self.inner.cancel.cancel();
        let mut writer = self.inner.writer.lock().await.take()?;
        Some(
            tokio::time::timeout(SHUTDOWN_TIMEOUT, writer.shutdown())
                .await
                .unwrap_or_else(|_| Err(std::io::ErrorKind::TimedOut.into())),
        )
    }

    /// Remember the first failure and stop the read loop
    pub(crate) fn record_failure(&self, error: ServerError) {
        let _ = self.inner.close_reason.set(error);
        self.inner.cancel.cancel();
    }

    /// Invoke the connection-closed callback unless it already ran
    ///
    /// An earlier recorded failure takes precedence over `error`.
    pub(crate) async fn report_closed(&self, error: ServerError) {
        if self.inner.close_reported.swap(true, Ordering::AcqRel) {
            trace!(connection_id = %self.inner.id, "Close already reported");
            return;
        }

        let error = self.inner.close_reason.get_or_init(|| error).clone();
        gauge!("frameline.connections.active").decrement(1.0);
        debug!(
            connection_id = %self.inner.id,
            peer_addr = %self.inner.peer_addr,
            error = %error,
            "Connection closed"
        );
        self.inner.handler.on_connection_closed(self, error).await;
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    pub(crate) fn handler(&self) -> &Arc<dyn ServerHandler> {
        &self.inner.handler
    }

    pub(crate) fn codec(&self) -> FrameCodec {
        self.inner.codec.clone()
    }

    pub(crate) fn record_message(&self, len: usize) {
        self.inner.messages_received.fetch_add(1, Ordering::Relaxed);
        self.inner
            .bytes_received
            .fetch_add(len as u64, Ordering::Relaxed);
        counter!("frameline.messages.received").increment(1);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("peer_addr", &self.inner.peer_addr)
            .field("tls", &self.inner.tls)
            .field("closed", &self.is_closed())
            .finish()
    }
}
