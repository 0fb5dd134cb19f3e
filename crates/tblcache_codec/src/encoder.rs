//! Canonical CBOR encoder.

use crate::decoder::canonical_order;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;

const UNSIGNED: u8 = 0;
const NEGATIVE: u8 = 1;
const TEXT: u8 = 3;
const ARRAY: u8 = 4;
const MAP: u8 = 5;

const FALSE: u8 = 0xf4;
const TRUE: u8 = 0xf5;
const NULL: u8 = 0xf6;
const DOUBLE: u8 = 0xfb;

/// Encodes a value to canonical CBOR.
///
/// The output is deterministic (RFC 8949 §4.2.1 core rules): shortest
/// arguments, definite lengths, map entries sorted by encoded key. Floats
/// are always written as doubles so a value never changes width between
/// writers.
///
/// # Errors
///
/// Returns an error if the value contains a NaN float.
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// Appends canonical CBOR items to a byte buffer.
#[derive(Debug, Default)]
pub struct CanonicalEncoder {
    out: Vec<u8>,
}

impl CanonicalEncoder {
    /// An encoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// An encoder whose buffer can take `capacity` bytes without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
        }
    }

    /// Appends one value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value contains a NaN float. The buffer may
    /// then hold a partial item.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => self.out.push(NULL),
            Value::Bool(false) => self.out.push(FALSE),
            Value::Bool(true) => self.out.push(TRUE),
            Value::Integer(n) => match u64::try_from(*n) {
                Ok(n) => self.head(UNSIGNED, n),
                // -1 - n is never negative, and fits because n < 0
                Err(_) => self.head(NEGATIVE, (-1 - *n).unsigned_abs()),
            },
            Value::Float(x) if x.is_nan() => return Err(CodecError::NaNForbidden),
            Value::Float(x) => {
                self.out.push(DOUBLE);
                self.out.extend_from_slice(&x.to_be_bytes());
            }
            Value::Text(s) => {
                self.head(TEXT, s.len() as u64);
                self.out.extend_from_slice(s.as_bytes());
            }
            Value::Array(items) => {
                self.head(ARRAY, items.len() as u64);
                for item in items {
                    self.encode(item)?;
                }
            }
            Value::Map(pairs) => self.map(pairs)?,
        }
        Ok(())
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Takes the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    /// Writes a head with the shortest argument that holds `arg`.
    fn head(&mut self, major: u8, arg: u64) {
        let top = major << 5;
        if let Ok(small) = u8::try_from(arg) {
            if small < 24 {
                self.out.push(top | small);
            } else {
                self.out.extend_from_slice(&[top | 24, small]);
            }
        } else if let Ok(arg) = u16::try_from(arg) {
            self.out.push(top | 25);
            self.out.extend_from_slice(&arg.to_be_bytes());
        } else if let Ok(arg) = u32::try_from(arg) {
            self.out.push(top | 26);
            self.out.extend_from_slice(&arg.to_be_bytes());
        } else {
            self.out.push(top | 27);
            self.out.extend_from_slice(&arg.to_be_bytes());
        }
    }

    fn map(&mut self, pairs: &[(Value, Value)]) -> CodecResult<()> {
        // Keys are sorted by their encoding, so encode them first
        let mut entries = pairs
            .iter()
            .map(|(key, value)| to_canonical_cbor(key).map(|key| (key, value)))
            .collect::<CodecResult<Vec<_>>>()?;
        entries.sort_by(|a, b| canonical_order(&a.0, &b.0));

        self.head(MAP, entries.len() as u64);
        for (key, value) in entries {
            self.out.extend_from_slice(&key);
            self.encode(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::from_cbor;

    fn cbor(value: impl Into<Value>) -> Vec<u8> {
        to_canonical_cbor(&value.into()).unwrap()
    }

    #[test]
    fn scalars_use_distinct_items() {
        assert_eq!(cbor(Value::Null), [NULL]);
        assert_eq!(cbor(false), [FALSE]);
        assert_eq!(cbor(true), [TRUE]);
        assert_eq!(cbor(""), [0x60]);
        assert_eq!(cbor("null"), [0x64, b'n', b'u', b'l', b'l']);
    }

    #[test]
    fn integer_arguments_are_shortest() {
        assert_eq!(cbor(0i64), [0x00]);
        assert_eq!(cbor(23i64), [0x17]);
        assert_eq!(cbor(24i64), [0x18, 24]);
        assert_eq!(cbor(255i64), [0x18, 0xff]);
        assert_eq!(cbor(256i64), [0x19, 0x01, 0x00]);
        assert_eq!(cbor(65_536i64), [0x1a, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(
            cbor(i64::MAX),
            [0x1b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn negative_integers() {
        assert_eq!(cbor(-1i64), [0x20]);
        assert_eq!(cbor(-24i64), [0x37]);
        assert_eq!(cbor(-100i64), [0x38, 99]);
        assert_eq!(
            cbor(i64::MIN),
            [0x3b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn floats_are_always_doubles() {
        let bytes = cbor(1.5);
        assert_eq!(bytes[0], DOUBLE);
        assert_eq!(bytes[1..], 1.5f64.to_be_bytes());
        // Even when a half would hold it exactly
        assert_eq!(cbor(0.0).len(), 9);
    }

    #[test]
    fn nan_is_refused_at_any_depth() {
        assert_eq!(
            to_canonical_cbor(&Value::Float(f64::NAN)),
            Err(CodecError::NaNForbidden)
        );
        let nested = Value::text_map([("a", Value::Array(vec![Value::Float(f64::NAN)]))]);
        assert_eq!(to_canonical_cbor(&nested), Err(CodecError::NaNForbidden));
    }

    #[test]
    fn map_entries_sorted_by_encoded_key() {
        let map = Value::Map(vec![
            (Value::from("bb"), Value::Integer(2)),
            (Value::from("c"), Value::Integer(3)),
            (Value::from("a"), Value::Integer(1)),
        ]);
        assert_eq!(
            to_canonical_cbor(&map).unwrap(),
            [0xa3, 0x61, b'a', 0x01, 0x61, b'c', 0x03, 0x62, b'b', b'b', 0x02]
        );
    }

    #[test]
    fn output_decodes_back() {
        let row = Value::text_map([
            ("id", Value::Integer(-7)),
            ("tags", Value::Array(vec![Value::from("x"), Value::Null])),
            ("score", Value::Float(0.25)),
        ]);
        assert_eq!(from_cbor(&cbor(row.clone())).unwrap(), row);
    }

    #[test]
    fn encoder_appends() {
        let mut encoder = CanonicalEncoder::with_capacity(4);
        encoder.encode(&Value::Integer(1)).unwrap();
        encoder.encode(&Value::Null).unwrap();
        assert_eq!(encoder.as_bytes(), [0x01, NULL]);
        assert_eq!(encoder.into_bytes(), vec![0x01, NULL]);
    }
}
