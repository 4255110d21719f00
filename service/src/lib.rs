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

//! Event-Callback TCP Server
//!
//! This crate accepts TCP (optionally TLS) connections, splits each inbound
//! byte stream into messages with a [`FramingStrategy`], and hands every
//! message to user-supplied callbacks.
//!
//! - Each connection is read by exactly one task, so messages from a
//!   connection are delivered in stream order
//! - Every connection gets one new-client callback before any message and at
//!   most one connection-closed callback, always last
//! - A failure on one connection never affects another
//!
//! # Architecture
//!
//! ```text
//! Server (callbacks + config)
//!     ↓ listen / bind
//! ServerListener (accept loop)
//!     ↓ one task per connection
//! ConnectionWorker → FrameCodec → ServerHandler
//! ```
//!
//! # Example
//!
//! ```no_run
//! use frameline_service::{FramingStrategy, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("localhost:9999");
//!     server
//!         .on_new_message(|conn, message| async move {
//!             let _ = conn.send_bytes(&message).await;
//!         })
//!         .on_client_connection_closed(|conn, error| async move {
//!             println!("{} closed: {}", conn.id(), error);
//!         });
//!
//!     server.listen(FramingStrategy::Delimiter).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod error;
mod handler;
mod server;
pub mod tls;
mod types;
mod worker;

pub use config::ServerConfig;
pub use connection::Connection;
pub use error::{Result, ServerError};
pub use frameline_codec::{CodecError, FramingStrategy};
pub use handler::{CallbackHandler, ServerHandler};
pub use server::{Server, ServerListener};
pub use tls::TlsError;
pub use types::ConnectionId;
