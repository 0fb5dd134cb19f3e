//! # tblcache codec
//!
//! Canonical CBOR encoding for cached table rows.
//!
//! Every cache entry is stored as one CBOR blob. Encoding is deterministic,
//! so two processes writing the same attributes write the same bytes:
//! - Maps are sorted by key (length-first, then bytewise)
//! - Integers use shortest encoding
//! - Floats are always 64-bit doubles, never NaN
//! - Strings must be UTF-8
//! - No byte strings, tags or indefinite-length items
//!
//! Null, booleans and text each keep their own CBOR type, so a `null`
//! attribute never comes back as the string `"null"` or `"@NULL@"`.
//!
//! ## Usage
//!
//! ```
//! use tblcache_codec::{to_canonical_cbor, from_cbor, Value};
//!
//! let row = Value::text_map([
//!     ("a", Value::Integer(1)),
//!     ("b", Value::from("x")),
//!     ("c", Value::Null),
//!     ("d", Value::Bool(true)),
//! ]);
//! let bytes = to_canonical_cbor(&row).unwrap();
//! assert_eq!(from_cbor(&bytes).unwrap(), row);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{from_cbor, CanonicalDecoder, MAX_DEPTH};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;

/// Trait for types that can be encoded to canonical CBOR.
pub trait Encode {
    /// Encode this value to canonical CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from CBOR.
pub trait Decode: Sized {
    /// Decode this value from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed or do not describe `Self`.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_canonical_cbor(self)
    }
}

impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}
