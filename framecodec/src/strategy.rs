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

use std::fmt;
use std::str::FromStr;

/// Byte that terminates a frame under [`FramingStrategy::Delimiter`].
pub const DELIMITER: u8 = b'\n';

/// Size in bytes of the big-endian length header used by
/// [`FramingStrategy::LengthPrefixed`].
pub const LENGTH_HEADER_SIZE: usize = 4;

/// Algorithm used to split a continuous byte stream into discrete messages.
///
/// The strategy is fixed for the lifetime of a listener; it is never
/// negotiated per connection.
///
/// # Example
/// ```
/// use frameline_codec::FramingStrategy;
///
/// let strategy: FramingStrategy = "lv".parse().unwrap();
/// assert_eq!(strategy, FramingStrategy::LengthPrefixed);
/// assert_eq!(strategy.to_string(), "lv");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FramingStrategy {
    /// Each message ends with (and includes) a newline byte (`0x0A`).
    ///
    /// Wire name: `by_str`.
    #[default]
    Delimiter,

    /// Each message is preceded by a 4-byte big-endian signed length.
    ///
    /// Wire name: `lv`.
    LengthPrefixed,
}

impl FramingStrategy {
    /// Short wire name of the strategy (`by_str` or `lv`)
    pub fn name(self) -> &'static str {
        match self {
            FramingStrategy::Delimiter => "by_str",
            FramingStrategy::LengthPrefixed => "lv",
        }
    }
}

impl fmt::Display for FramingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string does not name a known [`FramingStrategy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown framing strategy: {0:?}")]
pub struct UnknownStrategy(pub String);

impl FromStr for FramingStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "by_str" | "delimiter" | "line" => Ok(FramingStrategy::Delimiter),
            "lv" | "length-prefixed" | "length_prefixed" => Ok(FramingStrategy::LengthPrefixed),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}
