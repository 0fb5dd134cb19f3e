//! Serialized record store.

use crate::error::{CoreError, CoreResult};
use crate::index::IndexManager;
use crate::record::{CacheEntry, CachedRecord};
use crate::table::CachedTable;
use crate::types::IndexSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tblcache_codec::{Decode, Encode};
use tblcache_kv::{KeyTtl, KvStore};

/// Row blobs of one table, with their index entries.
///
/// Rows live under `{prefix}{{table}}:row:{token}`. Writing a row always
/// reconciles its index memberships; the two are never written apart.
#[derive(Clone)]
pub struct RecordStore {
    index: IndexManager,
}

impl RecordStore {
    /// Creates a store for one table.
    pub fn new(kv: Arc<dyn KvStore>, table: Arc<dyn CachedTable>) -> Self {
        Self {
            index: IndexManager::new(kv, table),
        }
    }

    /// Writes a row and reconciles its indexes against `previous`.
    ///
    /// A `None` or zero `ttl` keeps the row until it is deleted.
    /// Returns the record's new index snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the key-value store fails.
    pub fn put(
        &self,
        token: &str,
        entry: &CacheEntry,
        previous: &IndexSnapshot,
        ttl: Option<Duration>,
    ) -> CoreResult<IndexSnapshot> {
        let bytes = entry.encode()?;
        self.index.kv().set(&self.index.keys().row(token), &bytes, ttl)?;
        self.index.reconcile(token, &entry.record, previous)
    }

    /// Reads a row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptEntry`] if the blob cannot be decoded.
    pub fn get(&self, token: &str) -> CoreResult<Option<CacheEntry>> {
        let key = self.index.keys().row(token);
        match self.index.kv().get(&key)? {
            None => Ok(None),
            Some(bytes) => CacheEntry::decode(&bytes)
                .map(Some)
                .map_err(|e| CoreError::corrupt_entry(key, e.to_string())),
        }
    }

    /// Reads a row as a record handle whose snapshot reflects its stored values.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be read.
    pub fn load(&self, token: &str) -> CoreResult<Option<CachedRecord>> {
        Ok(self.get(token)?.map(|entry| {
            let snapshot = self.index.resolve(&entry.record);
            CachedRecord::from_entry(entry, snapshot)
        }))
    }

    /// Deletes a row and its memberships in `snapshot`.
    ///
    /// Returns `true` if the row existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn delete(&self, token: &str, snapshot: &IndexSnapshot) -> CoreResult<bool> {
        let existed = self.index.kv().delete(&self.index.keys().row(token))?;
        self.index.remove_all(token, snapshot)?;
        Ok(existed)
    }

    /// Checks whether a row is cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn exists(&self, token: &str) -> CoreResult<bool> {
        Ok(self.index.kv().exists(&self.index.keys().row(token))?)
    }

    /// Remaining lifetime of a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn ttl(&self, token: &str) -> CoreResult<KeyTtl> {
        Ok(self.index.kv().ttl(&self.index.keys().row(token))?)
    }

    /// Lists the tokens of every cached row.
    ///
    /// # Errors
    ///
    /// Returns an error if the key scan fails.
    pub fn list_keys(&self) -> CoreResult<Vec<String>> {
        let keys = self.index.kv().keys(&self.index.keys().row_pattern())?;
        Ok(keys
            .iter()
            .filter_map(|key| self.index.keys().token_of(key))
            .map(str::to_string)
            .collect())
    }

    /// The index manager this store writes through.
    pub fn index(&self) -> &IndexManager {
        &self.index
    }
}
