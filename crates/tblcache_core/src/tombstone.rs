//! Deletion tombstones.

use crate::error::CoreResult;
use crate::keys::KeySpace;
use crate::table::CachedTable;
use std::sync::Arc;
use std::time::Duration;
use tblcache_kv::KvStore;

/// Short-lived markers for rows whose deletion is in flight.
///
/// While a tombstone exists, no read path returns the row and no write
/// path puts it back in the cache.
#[derive(Clone)]
pub struct Tombstones {
    kv: Arc<dyn KvStore>,
    keys: KeySpace,
}

impl Tombstones {
    /// Creates the tombstone set of one table.
    pub fn new(kv: Arc<dyn KvStore>, table: &dyn CachedTable) -> Self {
        Self {
            kv,
            keys: KeySpace::new(&table.config().key_prefix, table.table_name()),
        }
    }

    /// Marks a row as being deleted. A zero or absent TTL never expires.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn mark(&self, token: &str, ttl: Option<Duration>) -> CoreResult<()> {
        self.kv.set(&self.keys.deleted(token), b"1", ttl)?;
        Ok(())
    }

    /// Checks for a tombstone.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn is_deleted(&self, token: &str) -> CoreResult<bool> {
        Ok(self.kv.exists(&self.keys.deleted(token))?)
    }

    /// Removes a tombstone.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn clear(&self, token: &str) -> CoreResult<()> {
        self.kv.delete(&self.keys.deleted(token))?;
        Ok(())
    }
}
