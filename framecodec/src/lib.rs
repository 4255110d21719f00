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

//! # Frameline Frame Codec
//!
//! This crate splits a continuous byte stream into discrete messages. It is
//! designed to work with `tokio_util::codec` and provides a stateful,
//! byte-oriented decoder that can be fed arbitrarily chunked input.
//!
//! ## Framing Strategies
//!
//! ### [`FramingStrategy::Delimiter`] (`by_str`)
//!
//! A message is every byte up to and including the next newline (`0x0A`).
//! There is no escaping, so this strategy suits line-oriented text protocols.
//!
//! ```text
//! "a\nbb\n"  =>  "a\n", "bb\n"
//! ```
//!
//! ### [`FramingStrategy::LengthPrefixed`] (`lv`)
//!
//! A message is a 4-byte big-endian signed length `N` followed by exactly `N`
//! bytes of payload. Payloads may contain any byte, including newlines.
//!
//! ```text
//! 00 00 00 03 'x' 'y' 'z'  =>  "xyz"
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use frameline_codec::{FrameCodec, FramingStrategy};
//! use futures::StreamExt;
//! use tokio::net::TcpStream;
//! use tokio_util::codec::FramedRead;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("127.0.0.1:9999").await?;
//! let mut frames = FramedRead::new(stream, FrameCodec::new(FramingStrategy::LengthPrefixed));
//!
//! while let Some(frame) = frames.next().await {
//!     println!("received {} bytes", frame?.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Decoding errors are reported through [`CodecError`]. A stream that ends in
//! the middle of a frame yields [`CodecError::Truncated`] rather than a partial
//! message, and frames over the configured limit yield
//! [`CodecError::FrameTooLarge`].

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod codec;
mod result;
mod strategy;

pub use codec::{DEFAULT_MAX_FRAME_LENGTH, FrameCodec};
pub use result::{CodecError, CodecResult};
pub use strategy::{DELIMITER, FramingStrategy, LENGTH_HEADER_SIZE, UnknownStrategy};
