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

//! Echo Server Example
//!
//! This example demonstrates a frameline echo server that:
//! - Accepts connections on 127.0.0.1:9999
//! - Frames input with the strategy named on the command line (`by_str` or `lv`)
//! - Echoes every message back using the same framing
//! - Optionally serves TLS when given a certificate and key
//!
//! ## Usage
//!
//! Run the server:
//! ```bash
//! cargo run --example echo_server -- by_str
//! cargo run --example echo_server -- lv server.crt server.key
//! ```
//!
//! Connect with netcat for delimiter framing:
//! ```bash
//! nc localhost 9999
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use frameline_service::{
    Connection, FramingStrategy, ServerConfig, ServerError, ServerHandler, ServerListener,
};
use std::sync::Arc;

const ADDRESS: &str = "127.0.0.1:9999";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let strategy: FramingStrategy = match args.next() {
        Some(name) => name.parse()?,
        None => FramingStrategy::Delimiter,
    };

    let mut config = ServerConfig::new(ADDRESS);
    if let (Some(cert), Some(key)) = (args.next(), args.next()) {
        config = config.with_tls_files(cert, key)?;
    }

    let listener = ServerListener::bind(config, strategy, Arc::new(EchoHandler)).await?;
    println!(
        "Echo server listening on {} ({} framing)",
        listener.local_addr(),
        listener.strategy()
    );
    println!("Press Ctrl+C to stop the server\n");

    listener
        .serve_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down server...");
        })
        .await?;

    println!("Server stopped");
    Ok(())
}

/// Echoes each message back to its sender
struct EchoHandler;

#[async_trait]
impl ServerHandler for EchoHandler {
    async fn on_new_client(&self, conn: &Connection) {
        tracing::info!("Client {} connected from {}", conn.id(), conn.peer_addr());
    }

    async fn on_new_message(&self, conn: &Connection, message: Bytes) {
        tracing::debug!("Client {} sent {} bytes", conn.id(), message.len());
        if let Err(e) = conn.send_frame(&message).await {
            tracing::error!("Failed to echo to {}: {}", conn.id(), e);
        }
    }

    async fn on_connection_closed(&self, conn: &Connection, error: ServerError) {
        tracing::info!(
            "Client {} disconnected after {} messages: {}",
            conn.id(),
            conn.messages_received(),
            error
        );
    }
}
