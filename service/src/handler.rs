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

//! Handler traits and implementations for the server

use crate::{Connection, ServerError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;

/// Server event handler trait
///
/// Implement this trait to handle events from the server. All methods are
/// async, have default implementations that do nothing, and are awaited on the
/// connection's own task, so callbacks for one connection never overlap.
///
/// # Example
///
/// ```no_run
/// use frameline_service::{Connection, ServerHandler};
/// use async_trait::async_trait;
/// use bytes::Bytes;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ServerHandler for Echo {
///     async fn on_new_message(&self, conn: &Connection, message: Bytes) {
///         let _ = conn.send_bytes(&message).await;
///     }
/// }
/// ```
#[async_trait]
pub trait ServerHandler: Send + Sync + 'static {
    /// Called once per accepted connection, before any message
    async fn on_new_client(&self, _conn: &Connection) {}

    /// Called for every frame decoded from the connection, in stream order
    async fn on_new_message(&self, _conn: &Connection, _message: Bytes) {}

    /// Called at most once per connection, after a read or send failure
    ///
    /// This is always the last callback for the connection.
    async fn on_connection_closed(&self, _conn: &Connection, _error: ServerError) {}
}

type NewClientFn = Box<dyn Fn(Connection) -> BoxFuture<'static, ()> + Send + Sync + 'static>;
type NewMessageFn =
    Box<dyn Fn(Connection, Bytes) -> BoxFuture<'static, ()> + Send + Sync + 'static>;
type ConnectionClosedFn =
    Box<dyn Fn(Connection, ServerError) -> BoxFuture<'static, ()> + Send + Sync + 'static>;

/// Callback-based handler implementation
///
/// Holds one closure per event slot. Every slot starts as a no-op and
/// registering a slot again replaces the previous closure.
///
/// # Example
///
/// ```no_run
/// use frameline_service::CallbackHandler;
///
/// let mut handler = CallbackHandler::new();
/// handler.on_new_message(|conn, message| async move {
///     let _ = conn.send_bytes(&message).await;
/// });
/// ```
pub struct CallbackHandler {
    new_client: NewClientFn,
    new_message: NewMessageFn,
    connection_closed: ConnectionClosedFn,
}

impl Default for CallbackHandler {
    fn default() -> Self {
        Self {
            new_client: Box::new(|_| futures::future::ready(()).boxed()),
            new_message: Box::new(|_, _| futures::future::ready(()).boxed()),
            connection_closed: Box::new(|_, _| futures::future::ready(()).boxed()),
        }
    }
}

impl CallbackHandler {
    /// Create a handler with no-op callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the callback invoked when a client connects
    pub fn on_new_client<F, Fut>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(Connection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.new_client = Box::new(move |conn| callback(conn).boxed());
        self
    }

    /// Set the callback invoked for each decoded message
    pub fn on_new_message<F, Fut>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(Connection, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.new_message = Box::new(move |conn, message| callback(conn, message).boxed());
        self
    }

    /// Set the callback invoked when a connection closes after a failure
    pub fn on_connection_closed<F, Fut>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(Connection, ServerError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.connection_closed = Box::new(move |conn, error| callback(conn, error).boxed());
        self
    }
}

impl std::fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl ServerHandler for CallbackHandler {
    async fn on_new_client(&self, conn: &Connection) {
        (self.new_client)(conn.clone()).await;
    }

    async fn on_new_message(&self, conn: &Connection, message: Bytes) {
        (self.new_message)(conn.clone(), message).await;
    }

    async fn on_connection_closed(&self, conn: &Connection, error: ServerError) {
        (self.connection_closed)(conn.clone(), error).await;
    }
}
