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

//! Server implementation
//!
//! [`Server`] collects callbacks and configuration. Calling
//! [`Server::listen`] (or [`Server::bind`]) freezes the callbacks and hands
//! them to a [`ServerListener`], which owns the TCP listener and runs the
//! accept loop.

use crate::connection::BoxedTransport;
use crate::types::ConnectionIdGenerator;
use crate::worker::ConnectionWorker;
use crate::{CallbackHandler, Connection, Result, ServerConfig, ServerError, ServerHandler};
use bytes::Bytes;
use frameline_codec::{FrameCodec, FramingStrategy};
use metrics::counter;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

/// Event-callback TCP server
///
/// # Example
///
/// ```no_run
/// use frameline_service::Server;
/// use frameline_codec::FramingStrategy;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut server = Server::new("127.0.0.1:9999");
///     server
///         .on_new_client(|conn| async move {
///             let _ = conn.send("hello\n").await;
///         })
///         .on_new_message(|conn, message| async move {
///             let _ = conn.send_bytes(&message).await;
///         });
///
///     server.listen(FramingStrategy::Delimiter).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    callbacks: CallbackHandler,
}

impl Server {
    /// Create a plain TCP server for `host:port` with no-op callbacks
    pub fn new(address: impl Into<String>) -> Self {
        let config = ServerConfig::new(address);
        info!("Creating server with address {}", config.bind_address);
        Self::from_config(config)
    }

    /// Create a TLS server, loading PEM certificate and key files
    ///
    /// Fails with [`ServerError::Tls`] if the material cannot be loaded.
    pub fn with_tls(
        address: impl Into<String>,
        cert_file: impl AsRef<Path>,
        key_file: impl AsRef<Path>,
    ) -> Result<Self> {
        let config = ServerConfig::new(address).with_tls_files(cert_file, key_file)?;
        info!("Creating TLS server with address {}", config.bind_address);
        Ok(Self::from_config(config))
    }

    /// Create a server from a prepared configuration
    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            config,
            callbacks: CallbackHandler::new(),
        }
    }

    /// Set the maximum frame length (`None` disables the limit)
    pub fn with_max_frame_length(mut self, max: Option<usize>) -> Self {
        self.config.max_frame_length = max;
        self
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Called right after a client connects, before any message
    pub fn on_new_client<F, Fut>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(Connection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        CallbackHandler::on_new_client(&mut self.callbacks, callback);
        self
    }

    /// Called for every message framed from a client
    pub fn on_new_message<F, Fut>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(Connection, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        CallbackHandler::on_new_message(&mut self.callbacks, callback);
        self
    }

    /// Called once when a client connection fails or is closed
    pub fn on_client_connection_closed<F, Fut>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(Connection, ServerError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        CallbackHandler::on_connection_closed(&mut self.callbacks, callback);
        self
    }

    /// Bind the listening socket without accepting yet
    pub async fn bind(self, strategy: FramingStrategy) -> Result<ServerListener> {
        ServerListener::bind(self.config, strategy, Arc::new(self.callbacks)).await
    }

    /// Bind and accept connections forever
    ///
    /// Only returns on a startup error such as a failed bind.
    pub async fn listen(self, strategy: FramingStrategy) -> Result<()> {
        self.bind(strategy).await?.serve().await
    }
}

/// A bound listener that accepts connections and spawns their workers
pub struct ServerListener {
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
    handler: Arc<dyn ServerHandler>,
    codec: FrameCodec,
    accept_backoff: Duration,
    ids: Arc<ConnectionIdGenerator>,
    local_addr: SocketAddr,
}

impl ServerListener {
    /// Bind the configured address with the given strategy and handler
    pub async fn bind(
        config: ServerConfig,
        strategy: FramingStrategy,
        handler: Arc<dyn ServerHandler>,
    ) -> Result<Self> {
        config.validate().map_err(ServerError::Config)?;

        let listener = TcpListener::bind(&config.bind_address)
            .await
            .map_err(|err| ServerError::Bind {
                address: config.bind_address.clone(),
                source: Arc::new(err),
            })?;
        let local_addr = listener.local_addr().map_err(|err| ServerError::Bind {
            address: config.bind_address.clone(),
            source: Arc::new(err),
        })?;

        info!(
            "Server bound to {} (framing: {}, tls: {})",
            local_addr,
            strategy,
            config.is_tls()
        );

        Ok(Self {
            listener,
            acceptor: config.tls.map(TlsAcceptor::from),
            handler,
            codec: FrameCodec::new(strategy).with_max_frame_length(config.max_frame_length),
            accept_backoff: config.accept_backoff,
            ids: Arc::new(ConnectionIdGenerator::new()),
            local_addr,
        })
    }

    /// Get the address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get the framing strategy used for every connection
    pub fn strategy(&self) -> FramingStrategy {
        self.codec.strategy()
    }

    /// Accept connections forever
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accept connections until `signal` completes
    ///
    /// Stopping the accept loop does not close connections that are already
    /// running.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(signal);

        loop {
            let accepted = tokio::select! {
                result = self.listener.accept() => result,
                () = &mut signal => break,
            };

            match accepted {
                Ok((socket, peer_addr)) => {
                    debug!("Accepted connection from {}", peer_addr);
                    self.spawn_connection(socket, peer_addr);
                }
                Err(err) => {
                    warn!("Failed to accept connection: {}", err);
                    counter!("frameline.errors.accept").increment(1);
                    tokio::time::sleep(self.accept_backoff).await;
                }
            }
        }

        info!("Accept loop on {} terminated", self.local_addr);
        Ok(())
    }

    fn spawn_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let acceptor = self.acceptor.clone();
        let handler = self.handler.clone();
        let codec = self.codec.clone();
        let ids = self.ids.clone();
        let local_addr = self.local_addr;

        tokio::spawn(async move {
            let local_addr = socket.local_addr().unwrap_or(local_addr);
            let tls = acceptor.is_some();
            let transport: BoxedTransport = match acceptor {
                Some(acceptor) => match acceptor.accept(socket).await {
                    Ok(stream) => Box::new(stream),
                    Err(err) => {
                        counter!("frameline.errors.handshake").increment(1);
                        let error = ServerError::Handshake(Arc::new(err));
                        debug!("Dropping connection from {}: {}", peer_addr, error);
                        return;
                    }
                },
                None => Box::new(socket),
            };

            let id = ids.next_id();
            let (connection, reader) =
                Connection::new(id, transport, peer_addr, local_addr, tls, codec, handler);
            debug!("Connection {} established from {}", id, peer_addr);
            ConnectionWorker::new(connection, reader).run().await;
        });
    }
}

impl std::fmt::Debug for ServerListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerListener")
            .field("local_addr", &self.local_addr)
            .field("strategy", &self.codec.strategy())
            .field("tls", &self.acceptor.is_some())
            .finish()
    }
}
