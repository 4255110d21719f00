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

use crate::{CodecError, CodecResult, DELIMITER, FramingStrategy, LENGTH_HEADER_SIZE};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Default upper bound on a single frame (16 MiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// A codec that splits a byte stream into messages using a [`FramingStrategy`].
///
/// `FrameCodec` implements [`Decoder`] for inbound frames and [`Encoder`] for
/// outbound payloads, so it can be paired with `FramedRead`, `FramedWrite` or
/// `Framed` over any async transport.
///
/// Frames larger than the configured maximum are rejected with
/// [`CodecError::FrameTooLarge`]. Passing `None` to
/// [`FrameCodec::with_max_frame_length`] removes the limit entirely.
///
/// # Example
/// ```
/// use bytes::BytesMut;
/// use frameline_codec::{FrameCodec, FramingStrategy};
/// use tokio_util::codec::Decoder;
///
/// let mut codec = FrameCodec::new(FramingStrategy::Delimiter);
/// let mut buffer = BytesMut::from(&b"a\nbb\n"[..]);
///
/// assert_eq!(codec.decode(&mut buffer).unwrap().unwrap(), &b"a\n"[..]);
/// assert_eq!(codec.decode(&mut buffer).unwrap().unwrap(), &b"bb\n"[..]);
/// assert!(codec.decode(&mut buffer).unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct FrameCodec {
    strategy: FramingStrategy,
    max_frame_length: Option<usize>,
    state: DecodeState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Delimiter framing: index to resume the newline search from
    Scanning(usize),
    /// Length-prefixed framing: waiting for the 4-byte header
    Header,
    /// Length-prefixed framing: waiting for a body of the given length
    Body(usize),
}

impl FrameCodec {
    /// Creates a codec for the given strategy with the default frame limit.
    pub fn new(strategy: FramingStrategy) -> FrameCodec {
        FrameCodec {
            strategy,
            max_frame_length: Some(DEFAULT_MAX_FRAME_LENGTH),
            state: DecodeState::initial(strategy),
        }
    }

    /// Sets the maximum frame length. `None` disables the limit.
    pub fn with_max_frame_length(mut self, max_frame_length: Option<usize>) -> FrameCodec {
        self.max_frame_length = max_frame_length;
        self
    }

    /// The framing strategy used by this codec
    pub fn strategy(&self) -> FramingStrategy {
        self.strategy
    }

    /// The maximum frame length, if any
    pub fn max_frame_length(&self) -> Option<usize> {
        self.max_frame_length
    }

    fn check_length(&self, length: usize) -> CodecResult<()> {
        match self.max_frame_length {
            Some(max) if length > max => Err(CodecError::FrameTooLarge { length, max }),
            _ => Ok(()),
        }
    }

    fn decode_delimited(&mut self, src: &mut BytesMut, from: usize) -> CodecResult<Option<Bytes>> {
        let from = from.min(src.len());
        match src[from..].iter().position(|byte| *byte == DELIMITER) {
            Some(offset) => {
                let length = from + offset + 1;
                self.state = DecodeState::Scanning(0);
                self.check_length(length)?;
                trace!(length, "decoded delimited frame");
                Ok(Some(src.split_to(length).freeze()))
            }
            None => {
                self.check_length(src.len())?;
                self.state = DecodeState::Scanning(src.len());
                Ok(None)
            }
        }
    }

    fn decode_header(&mut self, src: &mut BytesMut) -> CodecResult<Option<usize>> {
        if src.len() < LENGTH_HEADER_SIZE {
            src.reserve(LENGTH_HEADER_SIZE - src.len());
            return Ok(None);
        }

        let declared = i32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        if declared < 0 {
            return Err(CodecError::NegativeLength(declared));
        }

        let length = declared as usize;
        self.check_length(length)?;
        src.advance(LENGTH_HEADER_SIZE);
        trace!(length, "decoded length header");
        Ok(Some(length))
    }

    fn decode_body(&mut self, src: &mut BytesMut, length: usize) -> Option<Bytes> {
        if src.len() < length {
            src.reserve(length - src.len());
            return None;
        }
        self.state = DecodeState::Header;
        Some(src.split_to(length).freeze())
    }
}

impl DecodeState {
    fn initial(strategy: FramingStrategy) -> DecodeState {
        match strategy {
            FramingStrategy::Delimiter => DecodeState::Scanning(0),
            FramingStrategy::LengthPrefixed => DecodeState::Header,
        }
    }

    fn is_idle(self) -> bool {
        matches!(self, DecodeState::Scanning(0) | DecodeState::Header)
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.state {
            DecodeState::Scanning(from) => self.decode_delimited(src, from),
            DecodeState::Header => match self.decode_header(src)? {
                Some(length) => {
                    self.state = DecodeState::Body(length);
                    Ok(self.decode_body(src, length))
                }
                None => Ok(None),
            },
            DecodeState::Body(length) => Ok(self.decode_body(src, length)),
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() && self.state.is_idle() => Ok(None),
            None => {
                let buffered = buf.len();
                buf.clear();
                self.state = DecodeState::initial(self.strategy);
                Err(CodecError::Truncated { buffered })
            }
        }
    }
}

impl Encoder<&[u8]> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        match self.strategy {
            FramingStrategy::Delimiter => {
                let terminated = item.last() == Some(&DELIMITER);
                let length = item.len() + usize::from(!terminated);
                self.check_length(length)?;
                dst.reserve(length);
                dst.put_slice(item);
                if !terminated {
                    dst.put_u8(DELIMITER);
                }
            }
            FramingStrategy::LengthPrefixed => {
                self.check_length(item.len())?;
                let declared =
                    i32::try_from(item.len()).map_err(|_| CodecError::FrameTooLarge {
                        length: item.len(),
                        max: i32::MAX as usize,
                    })?;
                dst.reserve(LENGTH_HEADER_SIZE + item.len());
                dst.put_i32(declared);
                dst.put_slice(item);
            }
        }
        Ok(())
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        Encoder::<&[u8]>::encode(self, &item[..], dst)
    }
}
