//! Canonical CBOR decoder.
//!
//! Blobs come from a store shared with other processes, so every length
//! is bounded before anything is allocated and nesting is capped.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use std::cmp::Ordering;

/// Longest text string accepted, in bytes.
const MAX_TEXT_BYTES: u64 = 64 * 1024 * 1024;

/// Most items accepted in one array or map.
const MAX_ITEMS: u64 = 1024 * 1024;

/// Deepest container nesting accepted. A row envelope needs three levels.
pub const MAX_DEPTH: usize = 32;

/// Decodes exactly one value; trailing bytes are an error.
///
/// # Errors
///
/// Returns an error if the bytes are not canonical CBOR, use an item this
/// codec does not carry (byte strings, tags, narrow floats, NaN,
/// indefinite lengths), or have bytes left over after the value.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = CanonicalDecoder::new(bytes);
    let value = decoder.decode()?;
    match decoder.remaining().len() {
        0 => Ok(value),
        remaining => Err(CodecError::TrailingBytes { remaining }),
    }
}

/// CBOR major types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Major {
    Unsigned,
    Negative,
    Bytes,
    Text,
    Array,
    Map,
    Tag,
    Simple,
}

impl Major {
    fn of(initial: u8) -> Self {
        match initial >> 5 {
            0 => Major::Unsigned,
            1 => Major::Negative,
            2 => Major::Bytes,
            3 => Major::Text,
            4 => Major::Array,
            5 => Major::Map,
            6 => Major::Tag,
            _ => Major::Simple,
        }
    }
}

/// Initial byte of an item, split into major type and low five bits.
#[derive(Debug, Clone, Copy)]
struct Head {
    major: Major,
    low: u8,
}

/// Pull decoder over a byte slice.
///
/// Rejects anything a canonical encoder would not have written.
pub struct CanonicalDecoder<'a> {
    input: &'a [u8],
    offset: usize,
    depth: usize,
}

impl<'a> CanonicalDecoder<'a> {
    /// Starts decoding at the beginning of `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            depth: 0,
        }
    }

    /// Decodes the next item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is malformed, non-canonical or unsupported.
    pub fn decode(&mut self) -> CodecResult<Value> {
        let head = self.head()?;
        match head.major {
            Major::Unsigned => {
                let n = self.argument(head.low)?;
                i64::try_from(n)
                    .map(Value::Integer)
                    .map_err(|_| CodecError::unsupported_type("integer above i64::MAX"))
            }
            Major::Negative => {
                // The item stores -1 - n
                let n = self.argument(head.low)?;
                i64::try_from(n)
                    .map(|n| Value::Integer(-1 - n))
                    .map_err(|_| CodecError::unsupported_type("integer below i64::MIN"))
            }
            Major::Bytes => Err(CodecError::unsupported_type("byte string")),
            Major::Text => self.text(head.low),
            Major::Array | Major::Map => self.container(head),
            Major::Tag => Err(CodecError::decoding_failed("tagged values are not accepted")),
            Major::Simple => self.simple(head.low),
        }
    }

    /// True once every input byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.offset >= self.input.len()
    }

    /// The bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.input.get(self.offset..).unwrap_or_default()
    }

    fn head(&mut self) -> CodecResult<Head> {
        let [initial] = self.take::<1>()?;
        Ok(Head {
            major: Major::of(initial),
            low: initial & 0x1f,
        })
    }

    fn take_slice(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or(CodecError::UnexpectedEof)?;
        let input = self.input;
        let slice = &input[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn take<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take_slice(N)?);
        Ok(out)
    }

    /// Reads the argument that follows a head, insisting on its shortest form.
    fn argument(&mut self, low: u8) -> CodecResult<u64> {
        let (value, floor) = match low {
            0..=23 => return Ok(u64::from(low)),
            24 => (u64::from(u8::from_be_bytes(self.take()?)), 24),
            25 => (u64::from(u16::from_be_bytes(self.take()?)), 0x100),
            26 => (u64::from(u32::from_be_bytes(self.take()?)), 0x1_0000),
            27 => (u64::from_be_bytes(self.take()?), 0x1_0000_0000),
            31 => return Err(CodecError::IndefiniteLengthForbidden),
            _ => return Err(CodecError::invalid_structure("reserved additional info")),
        };
        if value < floor {
            return Err(CodecError::invalid_structure(
                "non-canonical: argument not in its shortest form",
            ));
        }
        Ok(value)
    }

    fn bounded_len(&mut self, low: u8, limit: u64) -> CodecResult<usize> {
        let claimed = self.argument(low)?;
        let too_long = CodecError::SizeLimitExceeded {
            claimed,
            max_allowed: limit,
        };
        if claimed > limit {
            return Err(too_long);
        }
        usize::try_from(claimed).map_err(|_| too_long)
    }

    fn text(&mut self, low: u8) -> CodecResult<Value> {
        let len = self.bounded_len(low, MAX_TEXT_BYTES)?;
        let raw = self.take_slice(len)?;
        std::str::from_utf8(raw)
            .map(|s| Value::Text(s.to_owned()))
            .map_err(|_| CodecError::InvalidUtf8)
    }

    fn container(&mut self, head: Head) -> CodecResult<Value> {
        let len = self.bounded_len(head.low, MAX_ITEMS)?;
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::NestingTooDeep { max: MAX_DEPTH });
        }
        self.depth += 1;
        let result = if head.major == Major::Map {
            self.map_body(len)
        } else {
            self.array_body(len)
        };
        self.depth -= 1;
        result
    }

    fn array_body(&mut self, len: usize) -> CodecResult<Value> {
        // Each item is at least one byte, so the input bounds the capacity
        let mut items = Vec::with_capacity(len.min(self.remaining().len()));
        for _ in 0..len {
            items.push(self.decode()?);
        }
        Ok(Value::Array(items))
    }

    fn map_body(&mut self, len: usize) -> CodecResult<Value> {
        let mut pairs = Vec::with_capacity(len.min(self.remaining().len() / 2));
        let input = self.input;
        let mut last_key: Option<&'a [u8]> = None;
        for _ in 0..len {
            let start = self.offset;
            let key = self.decode()?;
            let key_bytes = &input[start..self.offset];
            // Strictly increasing keys also rule out duplicates
            if last_key.is_some_and(|last| canonical_order(last, key_bytes) != Ordering::Less) {
                return Err(CodecError::invalid_structure(
                    "non-canonical: map keys out of order or repeated",
                ));
            }
            last_key = Some(key_bytes);
            let value = self.decode()?;
            pairs.push((key, value));
        }
        Ok(Value::Map(pairs))
    }

    fn simple(&mut self, low: u8) -> CodecResult<Value> {
        match low {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 => Ok(Value::Null),
            25 | 26 => Err(CodecError::NarrowFloat),
            27 => match f64::from_be_bytes(self.take()?) {
                x if x.is_nan() => Err(CodecError::NaNForbidden),
                x => Ok(Value::Float(x)),
            },
            31 => Err(CodecError::invalid_structure("break outside an indefinite item")),
            other => Err(CodecError::unsupported_type(format!("simple value {other}"))),
        }
    }
}

/// Orders encoded map keys: shorter first, then bytewise.
pub(crate) fn canonical_order(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
