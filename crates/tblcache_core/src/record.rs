//! Records, cache entries and record handles.

use crate::types::IndexSnapshot;
use std::collections::BTreeMap;
use tblcache_codec::{from_cbor, to_canonical_cbor, CodecError, CodecResult, Decode, Encode, Value};

/// A row's attributes, by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    attributes: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Returns an attribute.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    /// Sets an attribute, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(field.into(), value.into())
    }

    /// Removes an attribute.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.attributes.remove(field)
    }

    /// Returns all attributes.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Checks whether every `(field, value)` pair matches.
    pub fn matches(&self, criteria: &[(String, Value)]) -> bool {
        criteria
            .iter()
            .all(|(field, value)| self.attributes.get(field) == Some(value))
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(attributes: BTreeMap<String, Value>) -> Self {
        Self { attributes }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The blob stored under a row key.
///
/// Encoded as a CBOR map `{"new": bool, "dirty": bool, "fields": map}`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The row has never been written to the durable store.
    pub is_new: bool,
    /// The row has changes the durable store has not seen.
    pub dirty: bool,
    /// Row attributes.
    pub record: Record,
}

impl CacheEntry {
    fn to_value(&self) -> Value {
        let fields = Value::text_map(
            self.record
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Value::text_map([
            ("new", Value::Bool(self.is_new)),
            ("dirty", Value::Bool(self.dirty)),
            ("fields", fields),
        ])
    }

    fn from_value(value: &Value) -> CodecResult<Self> {
        let flag = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_bool)
                .ok_or_else(|| CodecError::decoding_failed(format!("missing flag {name}")))
        };
        let fields = value
            .get("fields")
            .and_then(Value::as_map)
            .ok_or_else(|| CodecError::decoding_failed("missing fields map"))?;

        let mut attributes = BTreeMap::new();
        for (k, v) in fields {
            let name = k
                .as_text()
                .ok_or_else(|| CodecError::decoding_failed("non-text field name"))?;
            if !v.is_scalar() {
                return Err(CodecError::decoding_failed(format!(
                    "field {name} holds a {}",
                    v.kind()
                )));
            }
            attributes.insert(name.to_string(), v.clone());
        }

        Ok(Self {
            is_new: flag("new")?,
            dirty: flag("dirty")?,
            record: Record { attributes },
        })
    }
}

impl Encode for CacheEntry {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_canonical_cbor(&self.to_value())
    }
}

impl Decode for CacheEntry {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        Self::from_value(&from_cbor(bytes)?)
    }
}

/// A caller-held handle on one record.
///
/// Carries the flags of its cache entry and the index values it was last
/// written with, which the next save diffs against.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRecord {
    record: Record,
    pub(crate) is_new: bool,
    pub(crate) dirty: bool,
    pub(crate) in_cache: bool,
    pub(crate) snapshot: IndexSnapshot,
}

impl CachedRecord {
    /// Wraps a record that exists nowhere yet.
    pub fn new(record: Record) -> Self {
        Self {
            record,
            is_new: true,
            dirty: false,
            in_cache: false,
            snapshot: IndexSnapshot::new(),
        }
    }

    pub(crate) fn from_entry(entry: CacheEntry, snapshot: IndexSnapshot) -> Self {
        Self {
            record: entry.record,
            is_new: entry.is_new,
            dirty: entry.dirty,
            in_cache: true,
            snapshot,
        }
    }

    pub(crate) fn from_durable(record: Record) -> Self {
        Self {
            record,
            is_new: false,
            dirty: false,
            in_cache: false,
            snapshot: IndexSnapshot::new(),
        }
    }

    pub(crate) fn to_entry(&self) -> CacheEntry {
        CacheEntry {
            is_new: self.is_new,
            dirty: self.dirty,
            record: self.record.clone(),
        }
    }

    pub(crate) fn replace_record(&mut self, record: Record) {
        self.record = record;
    }

    /// Returns the record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Returns the record for modification. Changes reach the cache on the next save.
    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    /// Unwraps the record.
    pub fn into_record(self) -> Record {
        self.record
    }

    /// Returns an attribute.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.record.get(field)
    }

    /// Sets an attribute.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.record.set(field, value)
    }

    /// True until the record is first written to the durable store.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// True while the cache holds changes the durable store has not seen.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True once the record has been written to the cache.
    pub fn in_cache(&self) -> bool {
        self.in_cache
    }

    /// Index values as of the last cache write.
    pub fn snapshot(&self) -> &IndexSnapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new()
            .with("a", 1)
            .with("b", "x")
            .with("c", Value::Null)
            .with("d", true)
            .with("e", 2.5)
    }

    #[test]
    fn entry_roundtrip_preserves_types() {
        let entry = CacheEntry {
            is_new: true,
            dirty: true,
            record: sample(),
        };
        let decoded = CacheEntry::decode(&entry.encode().unwrap()).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(decoded.record.get("c"), Some(&Value::Null));
        assert_eq!(decoded.record.get("d"), Some(&Value::Bool(true)));
    }

    #[test]
    fn lookalike_strings_stay_strings() {
        let record = Record::new()
            .with("n", "@NULL@")
            .with("f", "false")
            .with("e", "");
        let entry = CacheEntry {
            is_new: false,
            dirty: false,
            record: record.clone(),
        };
        let decoded = CacheEntry::decode(&entry.encode().unwrap()).unwrap();
        assert_eq!(decoded.record, record);
    }

    #[test]
    fn decode_rejects_foreign_blob() {
        let bytes = to_canonical_cbor(&Value::Integer(1)).unwrap();
        assert!(CacheEntry::decode(&bytes).is_err());

        let nested = Value::text_map([
            ("new", Value::Bool(false)),
            ("dirty", Value::Bool(false)),
            ("fields", Value::text_map([("a", Value::Array(vec![]))])),
        ]);
        let bytes = to_canonical_cbor(&nested).unwrap();
        assert!(matches!(
            CacheEntry::decode(&bytes),
            Err(CodecError::DecodingFailed { .. })
        ));
    }

    #[test]
    fn record_matches_criteria() {
        let record = sample();
        assert!(record.matches(&[("a".into(), Value::Integer(1))]));
        assert!(record.matches(&[]));
        assert!(!record.matches(&[("a".into(), Value::Integer(2))]));
        assert!(!record.matches(&[("zzz".into(), Value::Null)]));
    }

    #[test]
    fn new_handle_flags() {
        let handle = CachedRecord::new(sample());
        assert!(handle.is_new());
        assert!(!handle.is_dirty());
        assert!(!handle.in_cache());
        assert!(handle.snapshot().is_empty());
    }
}
