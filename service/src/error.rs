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

//! Error types for the server

use crate::tls::TlsError;
use frameline_codec::CodecError;
use std::sync::Arc;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types
///
/// Errors are cheap to clone so that a single failure can be handed both to
/// the connection-closed callback and to the caller that triggered it.
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested
        address: String,
        /// Underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Certificate material could not be loaded
    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    /// The server configuration is invalid
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The TLS handshake with a client failed
    #[error("TLS handshake failed: {0}")]
    Handshake(Arc<std::io::Error>),

    /// Reading or framing the inbound stream failed
    #[error("Stream error: {0}")]
    Stream(#[from] CodecError),

    /// The peer closed the connection
    #[error("Connection closed by peer")]
    PeerClosed,

    /// An outbound payload could not be framed
    #[error("Frame encoding failed: {0}")]
    Encode(CodecError),

    /// Writing to the connection failed
    #[error("Send failed: {0}")]
    Send(Arc<std::io::Error>),

    /// Shutting the transport down failed
    #[error("Close failed: {0}")]
    Close(Arc<std::io::Error>),

    /// The connection has already been closed locally
    #[error("Connection closed")]
    Closed,
}

impl ServerError {
    /// Check if the error prevents the server from starting
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            ServerError::Bind { .. } | ServerError::Tls(_) | ServerError::Config(_)
        )
    }

    /// Check if the error ended a connection's read loop
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            ServerError::Stream(_) | ServerError::PeerClosed | ServerError::Closed
        )
    }

    /// Check if the error came from a failed write
    pub fn is_send_error(&self) -> bool {
        matches!(self, ServerError::Send(_))
    }
}
