//! Value encodings for column pages.
//!
//! An encoding turns the non-null values of a page into a byte stream and
//! back. Nullability is handled separately by the page's presence bitmap, so
//! encoders and decoders only ever see values.

pub mod bitutil;
pub mod delta;
pub mod factory;
pub mod plain;

use std::fmt::{self, Debug};
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use self::delta::DeltaValuesDecoder;
use self::plain::PlainValuesDecoder;
use crate::errors::{PageCodecError, Result};
use crate::schema::PhysicalType;
use crate::value::Value;

/// Supported value encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Values back to back, fixed width or length prefixed.
    #[default]
    Plain,
    /// First value followed by zig-zag varint differences. Integer columns
    /// only, other types fall back to plain.
    Delta,
}

impl Encoding {
    pub(crate) const fn tag(&self) -> u8 {
        match self {
            Encoding::Plain => 0,
            Encoding::Delta => 5,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Encoding::Plain),
            5 => Some(Encoding::Delta),
            _ => None,
        }
    }

    /// Choose an encoding from the optional trailing command line token.
    ///
    /// Only the exact token "delta" selects delta, anything else (including
    /// typos) selects plain.
    pub fn from_cli_token(token: Option<&str>) -> Self {
        match token {
            Some("delta") => Encoding::Delta,
            _ => Encoding::Plain,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Delta => write!(f, "delta"),
        }
    }
}

impl FromStr for Encoding {
    type Err = PageCodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(Encoding::Plain),
            "delta" => Ok(Encoding::Delta),
            _ => Err(PageCodecError::UnsupportedEncoding(s.to_string())),
        }
    }
}

/// Incrementally encodes values for a single page.
///
/// Encoders are bound to one column and are reused across pages, `flush`
/// resets any state so that each page decodes independently.
pub trait ValuesEncoder: Debug + Send {
    /// Encoding of the bytes this encoder produces.
    fn encoding(&self) -> Encoding;

    fn physical_type(&self) -> PhysicalType;

    /// Number of value bytes buffered for the current page.
    fn buffered_len(&self) -> usize;

    /// Number of bytes the buffer would grow by if `value` were put next.
    fn encoded_len(&self, value: &Value) -> Result<usize>;

    /// Append a value to the current page.
    fn put(&mut self, value: &Value) -> Result<()>;

    /// Take the encoded bytes for the current page.
    fn flush(&mut self) -> Bytes;
}

/// Smallest value stream that can hold `count` values of a type.
pub fn min_values_len(encoding: Encoding, physical_type: PhysicalType, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    match (encoding, physical_type.fixed_width()) {
        // Full width first value, then at least a byte per difference.
        (Encoding::Delta, Some(width)) => width.saturating_add(count - 1),
        (_, Some(width)) => width.saturating_mul(count),
        (_, None) if physical_type == PhysicalType::Boolean => count.div_ceil(8),
        // Length prefix per byte array.
        (_, None) => count.saturating_mul(4),
    }
}

/// Decodes a page's value stream.
#[derive(Debug)]
pub enum ValuesDecoder {
    Plain(PlainValuesDecoder),
    Delta(DeltaValuesDecoder),
}

impl ValuesDecoder {
    pub fn try_new(encoding: Encoding, physical_type: PhysicalType, data: Bytes) -> Result<Self> {
        Ok(match encoding {
            Encoding::Plain => ValuesDecoder::Plain(PlainValuesDecoder::new(physical_type, data)),
            Encoding::Delta => {
                ValuesDecoder::Delta(DeltaValuesDecoder::try_new(physical_type, data)?)
            }
        })
    }

    /// Read the next value.
    ///
    /// Errors if the stream runs out of bytes.
    pub fn read_next(&mut self) -> Result<Value> {
        match self {
            ValuesDecoder::Plain(dec) => dec.read_next(),
            ValuesDecoder::Delta(dec) => dec.read_next(),
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        match self {
            ValuesDecoder::Plain(dec) => dec.remaining(),
            ValuesDecoder::Delta(dec) => dec.remaining(),
        }
    }
}
