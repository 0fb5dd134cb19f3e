//! Durable store interface.
//!
//! The cache never owns the authoritative copy of a row. It reads through
//! to a [`DurableStore`] on a miss and writes dirty rows back during dump
//! passes. [`MemoryDurableStore`] stands in for a relational table in tests.

use crate::record::Record;
use crate::types::PrimaryKey;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tblcache_codec::Value;
use thiserror::Error;

/// Result type for durable store operations.
pub type DurableResult<T> = Result<T, DurableError>;

/// Errors reported by a durable store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DurableError {
    /// The store could not be reached.
    #[error("durable store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the record.
    #[error("record {key} rejected: {message}")]
    Rejected {
        /// Primary key of the record.
        key: String,
        /// Reason given by the store.
        message: String,
    },

    /// The record lacks a primary key field.
    #[error("record has no primary key field {field}")]
    MissingKey {
        /// Missing field.
        field: String,
    },
}

/// The authoritative store behind one cached table.
pub trait DurableStore: Send + Sync {
    /// Loads a record by primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    fn load_by_key(&self, pk: &PrimaryKey) -> DurableResult<Option<Record>>;

    /// Inserts or updates a record.
    ///
    /// Returns the record as stored, including any fields the store filled in.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or rejects the record.
    fn persist(&self, record: &Record) -> DurableResult<Record>;

    /// Deletes a record. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    fn remove(&self, pk: &PrimaryKey) -> DurableResult<bool>;

    /// Lists records whose attributes equal every `(field, value)` pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    fn find_matching(&self, criteria: &[(String, Value)]) -> DurableResult<Vec<Record>>;
}

/// In-memory durable store with failure injection.
///
/// Records are keyed by their primary key fields. An optional
/// auto-increment field is assigned on first persist when absent or null.
pub struct MemoryDurableStore {
    key_fields: Vec<String>,
    auto_increment: Option<String>,
    next_id: AtomicU64,
    records: RwLock<BTreeMap<PrimaryKey, Record>>,
    rejected: RwLock<HashSet<PrimaryKey>>,
    unavailable: AtomicBool,
    persists: AtomicU64,
    removes: AtomicU64,
}

impl MemoryDurableStore {
    /// Creates an empty store keyed by the given fields.
    pub fn new<S: Into<String>>(key_fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            key_fields: key_fields.into_iter().map(Into::into).collect(),
            auto_increment: None,
            next_id: AtomicU64::new(1),
            records: RwLock::new(BTreeMap::new()),
            rejected: RwLock::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
            persists: AtomicU64::new(0),
            removes: AtomicU64::new(0),
        }
    }

    /// Fills `field` with the next id when a persisted record lacks it.
    #[must_use]
    pub fn with_auto_increment(mut self, field: impl Into<String>) -> Self {
        self.auto_increment = Some(field.into());
        self
    }

    /// Inserts a record directly, bypassing counters and failure injection.
    ///
    /// # Errors
    ///
    /// Returns an error if the record lacks a key field.
    pub fn seed(&self, record: Record) -> DurableResult<()> {
        let pk = self.key_of(&record)?;
        self.records.write().insert(pk, record);
        Ok(())
    }

    /// Makes every later persist of this key fail.
    pub fn reject(&self, pk: PrimaryKey) {
        self.rejected.write().insert(pk);
    }

    /// Makes every operation fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns a stored record.
    pub fn get(&self, pk: &PrimaryKey) -> Option<Record> {
        self.records.read().get(pk).cloned()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful persists.
    pub fn persist_count(&self) -> u64 {
        self.persists.load(Ordering::SeqCst)
    }

    /// Number of successful removes.
    pub fn remove_count(&self) -> u64 {
        self.removes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> DurableResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DurableError::Unavailable("injected outage".into()))
        } else {
            Ok(())
        }
    }

    fn key_of(&self, record: &Record) -> DurableResult<PrimaryKey> {
        let mut pairs = Vec::with_capacity(self.key_fields.len());
        for field in &self.key_fields {
            let value = record
                .get(field)
                .filter(|v| !v.is_null())
                .ok_or_else(|| DurableError::MissingKey {
                    field: field.clone(),
                })?;
            pairs.push((field.clone(), value.clone()));
        }
        Ok(PrimaryKey::from_pairs(pairs))
    }
}

impl DurableStore for MemoryDurableStore {
    fn load_by_key(&self, pk: &PrimaryKey) -> DurableResult<Option<Record>> {
        self.check_available()?;
        Ok(self.get(pk))
    }

    #[allow(clippy::cast_possible_wrap)]
    fn persist(&self, record: &Record) -> DurableResult<Record> {
        self.check_available()?;
        let mut stored = record.clone();
        if let Some(field) = &self.auto_increment {
            if stored.get(field).map_or(true, Value::is_null) {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                stored.set(field.clone(), Value::Integer(id as i64));
            }
        }

        let pk = self.key_of(&stored)?;
        if self.rejected.read().contains(&pk) {
            return Err(DurableError::Rejected {
                key: pk.to_string(),
                message: "injected rejection".into(),
            });
        }
        self.records.write().insert(pk, stored.clone());
        self.persists.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    fn remove(&self, pk: &PrimaryKey) -> DurableResult<bool> {
        self.check_available()?;
        let existed = self.records.write().remove(pk).is_some();
        if existed {
            self.removes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(existed)
    }

    fn find_matching(&self, criteria: &[(String, Value)]) -> DurableResult<Vec<Record>> {
        self.check_available()?;
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| r.matches(criteria))
            .cloned()
            .collect())
    }
}
