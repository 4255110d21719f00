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

//! Connection worker implementation
//!
//! The ConnectionWorker owns the read half of a single connection and drives
//! its lifecycle:
//! - new-client notification
//! - frame decoding and in-order message dispatch
//! - teardown and the single connection-closed notification

use crate::connection::TransportReader;
use crate::{Connection, ServerError};
use frameline_codec::FrameCodec;
use futures_util::StreamExt;
use tokio::select;
use tokio_util::codec::FramedRead;
use tracing::{debug, instrument, trace};

/// Worker that runs the read loop of a single connection
pub(crate) struct ConnectionWorker {
    /// Handle shared with application code
    connection: Connection,
    /// Decoded frames from the read half
    frames: FramedRead<TransportReader, FrameCodec>,
}

impl ConnectionWorker {
    /// Create a worker for a connection and its read half
    pub(crate) fn new(connection: Connection, reader: TransportReader) -> Self {
        let frames = FramedRead::new(reader, connection.codec());
        Self { connection, frames }
    }

    /// Run the worker until the connection fails or is closed
    #[instrument(skip(self), fields(connection_id = %self.connection.id(), peer_addr = %self.connection.peer_addr()))]
    pub(crate) async fn run(mut self) {
        debug!("Connection worker started");
        let handler = self.connection.handler().clone();

        handler.on_new_client(&self.connection).await;

        let error = self.read_loop().await;

        // Release the read half before shutting the write half down so the
        // socket is fully closed once the shutdown completes.
        let Self { connection, frames } = self;
        drop(frames);
        if let Some(Err(err)) = connection.shutdown_transport().await {
            trace!(error = %err, "Transport shutdown failed");
        }
        connection.report_closed(error).await;

        debug!("Connection worker finished");
    }

    /// Decode and dispatch frames until the first failure
    async fn read_loop(&mut self) -> ServerError {
        let handler = self.connection.handler().clone();
        let cancel = self.connection.cancellation().clone();

        loop {
            let next = select! {
                biased;
                _ = cancel.cancelled() => return ServerError::Closed,
                next = self.frames.next() => next,
            };

            match next {
                Some(Ok(message)) => {
                    if self.connection.is_closed() {
                        return ServerError::Closed;
                    }
                    trace!(len = message.len(), "Dispatching message");
                    self.connection.record_message(message.len());
                    handler.on_new_message(&self.connection, message).await;
                }
                Some(Err(err)) => return ServerError::Stream(err),
                None => return ServerError::PeerClosed,
            }
        }
    }
}

impl std::fmt::Debug for ConnectionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionWorker")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
