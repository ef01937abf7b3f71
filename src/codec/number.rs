//! Option number registry and option value formats

use serde::{Deserialize, Serialize};
use std::fmt;

/// Option numbers that are multiples of this value are fenceposts (zero-length no-ops).
pub const FENCEPOST_DIVISOR: u16 = 14;

/// Known option kinds, resolved from the accumulated option number.
///
/// Numbers without a registered meaning resolve to [`OptionKind::Unknown`] so that
/// forward-compatible options survive a decode/encode cycle untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionKind {
    ContentType,
    MaxAge,
    ProxyUri,
    ETag,
    UriHost,
    LocationPath,
    UriPort,
    LocationQuery,
    UriPath,
    Observe,
    Token,
    Accept,
    IfMatch,
    /// Zero-length jump option at a multiple of 14
    Fencepost(u16),
    UriQuery,
    Block2,
    Block1,
    IfNoneMatch,
    /// Opaque option with an unregistered number
    Unknown(u16),
}

/// Wire format of an option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionFormat {
    Empty,
    Opaque,
    Uint,
    String,
}

impl OptionKind {
    /// Resolve the option kind for an option number.
    pub const fn from_number(number: u16) -> Self {
        match number {
            1 => OptionKind::ContentType,
            2 => OptionKind::MaxAge,
            3 => OptionKind::ProxyUri,
            4 => OptionKind::ETag,
            5 => OptionKind::UriHost,
            6 => OptionKind::LocationPath,
            7 => OptionKind::UriPort,
            8 => OptionKind::LocationQuery,
            9 => OptionKind::UriPath,
            10 => OptionKind::Observe,
            11 => OptionKind::Token,
            12 => OptionKind::Accept,
            13 => OptionKind::IfMatch,
            15 => OptionKind::UriQuery,
            17 => OptionKind::Block2,
            19 => OptionKind::Block1,
            21 => OptionKind::IfNoneMatch,
            n if n != 0 && n % FENCEPOST_DIVISOR == 0 => OptionKind::Fencepost(n),
            other => OptionKind::Unknown(other),
        }
    }

    /// The option number carried on the wire.
    pub const fn number(self) -> u16 {
        match self {
            OptionKind::ContentType => 1,
            OptionKind::MaxAge => 2,
            OptionKind::ProxyUri => 3,
            OptionKind::ETag => 4,
            OptionKind::UriHost => 5,
            OptionKind::LocationPath => 6,
            OptionKind::UriPort => 7,
            OptionKind::LocationQuery => 8,
            OptionKind::UriPath => 9,
            OptionKind::Observe => 10,
            OptionKind::Token => 11,
            OptionKind::Accept => 12,
            OptionKind::IfMatch => 13,
            OptionKind::Fencepost(n) => n,
            OptionKind::UriQuery => 15,
            OptionKind::Block2 => 17,
            OptionKind::Block1 => 19,
            OptionKind::IfNoneMatch => 21,
            OptionKind::Unknown(n) => n,
        }
    }

    pub const fn format(self) -> OptionFormat {
        match self {
            OptionKind::ContentType
            | OptionKind::MaxAge
            | OptionKind::UriPort
            | OptionKind::Observe
            | OptionKind::Accept
            | OptionKind::Block2
            | OptionKind::Block1 => OptionFormat::Uint,
            OptionKind::ProxyUri
            | OptionKind::UriHost
            | OptionKind::LocationPath
            | OptionKind::LocationQuery
            | OptionKind::UriPath
            | OptionKind::UriQuery => OptionFormat::String,
            OptionKind::Fencepost(_) | OptionKind::IfNoneMatch => OptionFormat::Empty,
            OptionKind::ETag | OptionKind::Token | OptionKind::IfMatch | OptionKind::Unknown(_) => {
                OptionFormat::Opaque
            }
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            OptionKind::ContentType => "Content-Type",
            OptionKind::MaxAge => "Max-Age",
            OptionKind::ProxyUri => "Proxy-Uri",
            OptionKind::ETag => "ETag",
            OptionKind::UriHost => "Uri-Host",
            OptionKind::LocationPath => "Location-Path",
            OptionKind::UriPort => "Uri-Port",
            OptionKind::LocationQuery => "Location-Query",
            OptionKind::UriPath => "Uri-Path",
            OptionKind::Observe => "Observe",
            OptionKind::Token => "Token",
            OptionKind::Accept => "Accept",
            OptionKind::IfMatch => "If-Match",
            OptionKind::Fencepost(_) => "Fencepost",
            OptionKind::UriQuery => "Uri-Query",
            OptionKind::Block2 => "Block2",
            OptionKind::Block1 => "Block1",
            OptionKind::IfNoneMatch => "If-None-Match",
            OptionKind::Unknown(_) => "Unknown",
        }
    }

    pub const fn is_fencepost(self) -> bool {
        matches!(self, OptionKind::Fencepost(_))
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Unknown(n) => write!(f, "Unknown({})", n),
            OptionKind::Fencepost(n) => write!(f, "Fencepost({})", n),
            other => f.write_str(other.name()),
        }
    }
}

/// Decode a variable-length big-endian unsigned integer (0 to 4 bytes).
pub fn decode_uint(bytes: &[u8]) -> Option<u32> {
    if bytes.len() > 4 {
        return None;
    }
    Some(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
}

/// Encode an unsigned integer with the minimal number of bytes (zero is empty).
pub fn encode_uint(value: u32) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    bytes[skip..].to_vec()
}

/// Decoded value of a Block1/Block2 option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockValue {
    /// Block number
    pub num: u32,
    /// More blocks follow
    pub more: bool,
    /// Size exponent, block size is `2^(szx + 4)`
    pub szx: u8,
}

impl BlockValue {
    pub fn new(num: u32, more: bool, szx: u8) -> Self {
        Self { num, more, szx: szx & 0x07 }
    }

    pub fn from_uint(value: u32) -> Self {
        Self { num: value >> 4, more: value & 0x08 != 0, szx: (value & 0x07) as u8 }
    }

    pub fn to_uint(self) -> u32 {
        (self.num << 4) | ((self.more as u32) << 3) | (self.szx & 0x07) as u32
    }

    /// Block size in bytes.
    pub fn size(self) -> usize {
        1 << (self.szx as usize + 4)
    }
}
