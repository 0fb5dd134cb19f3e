//! Secondary index maintenance.

use crate::error::CoreResult;
use crate::keys::KeySpace;
use crate::record::Record;
use crate::table::CachedTable;
use crate::types::IndexSnapshot;
use std::sync::Arc;
use tblcache_kv::KvStore;
use tracing::debug;

/// Keeps index entry sets in step with record writes.
///
/// Each index entry is a set of primary key tokens under
/// `{prefix}{{table}}:index:{name}:{value}`. A record is a member of
/// exactly the entries its last written values produce.
#[derive(Clone)]
pub struct IndexManager {
    kv: Arc<dyn KvStore>,
    table: Arc<dyn CachedTable>,
    keys: KeySpace,
}

impl IndexManager {
    /// Creates a manager for one table.
    pub fn new(kv: Arc<dyn KvStore>, table: Arc<dyn CachedTable>) -> Self {
        let keys = KeySpace::new(&table.config().key_prefix, table.table_name());
        Self { kv, table, keys }
    }

    /// Computes every index value of a record.
    pub fn resolve(&self, record: &Record) -> IndexSnapshot {
        self.table
            .index_definitions()
            .resolve(record, self.table.field_delimiter())
    }

    /// Moves `token` to the index entries matching `record`.
    ///
    /// `previous` is the snapshot returned by the last reconcile of this
    /// record (empty for a record never written). Returns the snapshot to
    /// pass next time.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails. Entries touched
    /// before the failure stay touched.
    pub fn reconcile(
        &self,
        token: &str,
        record: &Record,
        previous: &IndexSnapshot,
    ) -> CoreResult<IndexSnapshot> {
        let current = self.resolve(record);

        for name in self.table.index_definitions().names() {
            let old = previous.get(name);
            let new = current.get(name);

            if old == new {
                if let Some(value) = new {
                    let key = self.keys.index(name, value);
                    if !self.kv.sismember(&key, token)? {
                        self.kv.sadd(&key, token)?;
                    }
                }
                continue;
            }
            if let Some(value) = old {
                self.kv.srem(&self.keys.index(name, value), token)?;
            }
            if let Some(value) = new {
                self.kv.sadd(&self.keys.index(name, value), token)?;
            }
        }

        // Indexes dropped from the definitions since the last write
        for (name, value) in previous.iter() {
            if self.table.index_definitions().get(name).is_none() {
                self.kv.srem(&self.keys.index(name, value), token)?;
            }
        }

        Ok(current)
    }

    /// Removes `token` from every entry in `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn remove_all(&self, token: &str, snapshot: &IndexSnapshot) -> CoreResult<()> {
        for (name, value) in snapshot.iter() {
            self.kv.srem(&self.keys.index(name, value), token)?;
        }
        Ok(())
    }

    /// Lists the tokens in one index entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is undefined or the store fails.
    pub fn members(&self, index: &str, value: &str) -> CoreResult<Vec<String>> {
        self.require(index)?;
        Ok(self.kv.smembers(&self.keys.index(index, value))?)
    }

    /// Drops a token whose row no longer exists.
    pub(crate) fn prune(&self, index_key: &str, token: &str) -> CoreResult<()> {
        if self.kv.srem(index_key, token)? {
            debug!(table = self.table.table_name(), key = index_key, token, "pruned dangling index member");
        }
        Ok(())
    }

    /// Lists the values present in one index, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is undefined or the store fails.
    pub fn index_values(&self, index: &str) -> CoreResult<Vec<String>> {
        self.require(index)?;
        let keys = self.kv.keys(&self.keys.index_pattern(index))?;
        Ok(keys
            .iter()
            .filter_map(|key| self.keys.index_value_of(index, key))
            .map(str::to_string)
            .collect())
    }

    pub(crate) fn require(&self, index: &str) -> CoreResult<()> {
        self.table
            .index_definitions()
            .require(self.table.table_name(), index)
            .map(|_| ())
    }

    pub(crate) fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub(crate) fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    pub(crate) fn table(&self) -> &Arc<dyn CachedTable> {
        &self.table
    }
}
