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

use std::sync::Arc;

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Represents possible errors that can occur while framing a byte stream.
///
/// Every variant is scoped to the stream that produced it. A decoder that
/// returns an error must not be fed more input from the same stream.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    /// The underlying stream failed while a frame was being read.
    ///
    /// The I/O error is shared so the same failure can be reported to more
    /// than one observer.
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// A length prefix declared a negative body length.
    #[error("negative frame length: {0}")]
    NegativeLength(i32),

    /// A frame exceeded the configured maximum length.
    #[error("frame length {length} exceeds maximum of {max} bytes")]
    FrameTooLarge {
        /// Length of the offending frame (declared or buffered so far)
        length: usize,
        /// The configured limit
        max: usize,
    },

    /// The stream ended in the middle of a frame.
    #[error("stream ended with {buffered} bytes of an incomplete frame")]
    Truncated {
        /// Number of bytes of the incomplete frame that were buffered
        buffered: usize,
    },
}

impl CodecError {
    /// Returns the I/O error kind if this error came from the underlying stream.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            CodecError::Io(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Check if the error was caused by malformed input rather than the transport
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            CodecError::NegativeLength(_) | CodecError::FrameTooLarge { .. }
        )
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::FrameTooLarge {
            length: 2048,
            max: 1024,
        };
        assert_eq!(
            err.to_string(),
            "frame length 2048 exceeds maximum of 1024 bytes"
        );

        let err = CodecError::Truncated { buffered: 3 };
        assert_eq!(
            err.to_string(),
            "stream ended with 3 bytes of an incomplete frame"
        );
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let err = CodecError::from(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::ConnectionReset));
        assert!(!err.is_protocol_error());
        assert!(CodecError::NegativeLength(-1).is_protocol_error());
    }
}
