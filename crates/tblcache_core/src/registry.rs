//! Process-scoped table registry.

use crate::cache::TableCache;
use crate::error::{CoreError, CoreResult};
use crate::keys::tables_list_key;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tblcache_kv::KvStore;
use tracing::debug;

/// The cached tables of one process.
///
/// Registration also records the table in the store-wide `tables:list`
/// hash (table name to implementing type), which is how a synchronizer
/// process learns which tables exist.
pub struct TableRegistry {
    kv: Arc<dyn KvStore>,
    list_key: String,
    tables: RwLock<BTreeMap<String, Arc<TableCache>>>,
}

impl TableRegistry {
    /// Creates an empty registry writing under `prefix`.
    pub fn new(kv: Arc<dyn KvStore>, prefix: &str) -> Self {
        Self {
            kv,
            list_key: tables_list_key(prefix),
            tables: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers a table, replacing any earlier registration of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn register(&self, cache: Arc<TableCache>) -> CoreResult<()> {
        let name = cache.table().table_name().to_string();
        self.kv
            .hset(&self.list_key, &name, cache.table().type_name())?;
        debug!(table = %name, "table registered");
        self.tables.write().insert(name, cache);
        Ok(())
    }

    /// Returns a registered table.
    pub fn lookup(&self, name: &str) -> Option<Arc<TableCache>> {
        self.tables.read().get(name).cloned()
    }

    /// Returns a registered table or an error naming it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownTable`] if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> CoreResult<Arc<TableCache>> {
        self.lookup(name).ok_or_else(|| CoreError::UnknownTable {
            table: name.to_string(),
        })
    }

    /// Removes a table. Returns `true` if it was registered here.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn unregister(&self, name: &str) -> CoreResult<bool> {
        self.kv.hdel(&self.list_key, name)?;
        Ok(self.tables.write().remove(name).is_some())
    }

    /// Names registered in this process, sorted.
    pub fn registered_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Tables listed in the store by any process, as `(name, type)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn listed(&self) -> CoreResult<Vec<(String, String)>> {
        let mut listed = self.kv.hgetall(&self.list_key)?;
        listed.sort();
        Ok(listed)
    }

    /// Number of tables registered in this process.
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    /// Returns true if nothing is registered in this process.
    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Unregisters every table of this process.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails; tables not yet
    /// removed stay registered.
    pub fn teardown(&self) -> CoreResult<()> {
        for name in self.registered_names() {
            self.unregister(&name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::MemoryDurableStore;
    use crate::table::TableDef;
    use tblcache_kv::{InMemoryKvStore, SystemClock};

    fn cache(kv: &Arc<InMemoryKvStore>, def: TableDef) -> Arc<TableCache> {
        Arc::new(TableCache::new(
            Arc::new(def),
            kv.clone(),
            Arc::new(MemoryDurableStore::new(["id"])),
            Arc::new(SystemClock),
        ))
    }

    #[test]
    fn register_lookup_teardown() {
        let kv = Arc::new(InMemoryKvStore::new());
        let registry = TableRegistry::new(kv.clone(), "tblRedis:");
        registry
            .register(cache(&kv, TableDef::new("users", ["id"]).registered_as("UserTable")))
            .unwrap();
        registry
            .register(cache(&kv, TableDef::new("orders", ["id"])))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.registered_names(), vec!["orders", "users"]);
        assert!(registry.lookup("users").is_some());
        assert_eq!(
            kv.hget("tblRedis:tables:list", "users").unwrap().as_deref(),
            Some("UserTable")
        );
        assert_eq!(
            registry.listed().unwrap(),
            vec![
                ("orders".to_string(), "TableDef".to_string()),
                ("users".to_string(), "UserTable".to_string())
            ]
        );

        registry.teardown().unwrap();
        assert!(registry.is_empty());
        assert!(!kv.exists("tblRedis:tables:list").unwrap());
    }

    #[test]
    fn unknown_table_is_configuration_error() {
        let registry = TableRegistry::new(Arc::new(InMemoryKvStore::new()), "tblRedis:");
        let err = registry.get("ghost").err().unwrap();
        assert!(err.is_configuration());
        assert!(!registry.unregister("ghost").unwrap());
    }

    #[test]
    fn listed_includes_other_processes() {
        let kv = Arc::new(InMemoryKvStore::new());
        kv.hset("tblRedis:tables:list", "remote", "RemoteTable").unwrap();
        let registry = TableRegistry::new(kv, "tblRedis:");
        assert_eq!(registry.listed().unwrap().len(), 1);
        assert!(registry.lookup("remote").is_none());
    }
}
