//! Table cache facade.

use crate::durable::DurableStore;
use crate::error::CoreResult;
use crate::index::{compose, IndexQuery, RecordStream};
use crate::record::{CachedRecord, Record};
use crate::store::RecordStore;
use crate::sync::{is_stale, DumpOutcome, DumpSynchronizer};
use crate::table::CachedTable;
use crate::tombstone::Tombstones;
use crate::types::{IndexSnapshot, PrimaryKey};
use std::sync::Arc;
use std::time::Duration;
use tblcache_codec::Value;
use tblcache_kv::{Clock, KeyTtl, KvStore};
use tracing::debug;

/// Write-behind cache of one table.
///
/// Writes land in the key-value store immediately, flagged dirty, and reach
/// the durable store on the next dump pass. Reads check the cache first and
/// fall back to the durable store, repopulating the cache. A tombstone on a
/// row blocks both.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tblcache_core::{IndexQuery, MemoryDurableStore, PrimaryKey, Record, TableCache, TableDef};
/// use tblcache_kv::{InMemoryKvStore, SystemClock};
///
/// let table = TableDef::new("users", ["id"]).index_fields("team", ["team"]);
/// let cache = TableCache::new(
///     Arc::new(table),
///     Arc::new(InMemoryKvStore::new()),
///     Arc::new(MemoryDurableStore::new(["id"])),
///     Arc::new(SystemClock),
/// );
///
/// cache.create(Record::new().with("id", 1).with("team", "red")).unwrap();
/// let found = cache.find_by_pk(&PrimaryKey::single("id", 1)).unwrap();
/// assert!(found.unwrap().is_dirty());
///
/// let red: Vec<_> = cache
///     .find_by_index(&IndexQuery::new("team", "red"))
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(red.len(), 1);
/// ```
pub struct TableCache {
    table: Arc<dyn CachedTable>,
    durable: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    store: RecordStore,
    tombstones: Tombstones,
    sync: DumpSynchronizer,
}

impl TableCache {
    /// Creates the cache of one table.
    pub fn new(
        table: Arc<dyn CachedTable>,
        kv: Arc<dyn KvStore>,
        durable: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = RecordStore::new(kv.clone(), table.clone());
        let tombstones = Tombstones::new(kv.clone(), table.as_ref());
        let sync = DumpSynchronizer::new(kv, clock.clone(), store.index().keys().clone());
        Self {
            table,
            durable,
            clock,
            store,
            tombstones,
            sync,
        }
    }

    /// Derives a record's primary key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::MissingPrimaryKey`] if a key field is absent.
    pub fn primary_key_of(&self, record: &Record) -> CoreResult<PrimaryKey> {
        PrimaryKey::from_attributes(
            self.table.table_name(),
            self.table.primary_key(),
            record.attributes(),
        )
    }

    fn token_of(&self, record: &Record) -> CoreResult<String> {
        Ok(self
            .primary_key_of(record)?
            .token(self.table.field_delimiter()))
    }

    fn token(&self, pk: &PrimaryKey) -> String {
        pk.token(self.table.field_delimiter())
    }

    fn row_ttl(&self) -> Option<Duration> {
        let ttl = self.table.row_ttl();
        (!ttl.is_zero()).then_some(ttl)
    }

    /// Wraps a new record and saves it to the cache.
    ///
    /// The record is not written to the durable store until a dump pass
    /// picks it up. If a tombstone exists for its key, the handle is
    /// returned without being cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is incomplete or the store fails.
    pub fn create(&self, record: Record) -> CoreResult<CachedRecord> {
        let mut handle = CachedRecord::new(record);
        self.save(&mut handle)?;
        Ok(handle)
    }

    /// Write-behind save: marks the record dirty and writes it to the cache.
    ///
    /// Returns `false` without writing while the row is tombstoned.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is incomplete or the store fails.
    pub fn save(&self, handle: &mut CachedRecord) -> CoreResult<bool> {
        let token = self.token_of(handle.record())?;
        if self.tombstones.is_deleted(&token)? {
            debug!(table = self.table.table_name(), token = %token, "save refused, row is being deleted");
            return Ok(false);
        }
        handle.dirty = true;
        self.write(&token, handle)?;
        Ok(true)
    }

    /// Forced save: writes the record to the durable store now.
    ///
    /// A newly created record is replaced with the stored version, picking
    /// up fields the durable store generated. A handle backed by a cache
    /// entry then has that entry rewritten clean with a fresh TTL, unless
    /// the row is tombstoned. A handle that was never cached stays out of
    /// the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable store or the cache fails. The handle
    /// is unchanged when the durable store fails.
    pub fn save_durable(&self, handle: &mut CachedRecord) -> CoreResult<()> {
        let stored = self.durable.persist(handle.record())?;
        if handle.is_new {
            handle.replace_record(stored);
        }
        handle.is_new = false;
        handle.dirty = false;
        if !handle.in_cache {
            return Ok(());
        }

        let token = self.token_of(handle.record())?;
        if self.tombstones.is_deleted(&token)? {
            return Ok(());
        }
        self.write(&token, handle)
    }

    fn write(&self, token: &str, handle: &mut CachedRecord) -> CoreResult<()> {
        handle.snapshot = self
            .store
            .put(token, &handle.to_entry(), &handle.snapshot, self.row_ttl())?;
        handle.in_cache = true;
        Ok(())
    }

    /// Removes a row from the cache only. Returns `true` if it was cached.
    ///
    /// Unsaved changes in the row are lost.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn evict(&self, pk: &PrimaryKey) -> CoreResult<bool> {
        let token = self.token(pk);
        let snapshot = self.stored_snapshot(&token)?.unwrap_or_default();
        self.store.delete(&token, &snapshot)
    }

    /// Removes a handle's row from the cache only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is incomplete or the store fails.
    pub fn evict_record(&self, handle: &mut CachedRecord) -> CoreResult<bool> {
        let token = self.token_of(handle.record())?;
        let existed = self.store.delete(&token, &handle.snapshot)?;
        handle.in_cache = false;
        handle.snapshot = IndexSnapshot::new();
        Ok(existed)
    }

    /// Deletes a record from the durable store and the cache.
    ///
    /// A tombstone covers the row while the durable delete runs, so no
    /// concurrent read can put the row back in the cache. A record never
    /// written to the durable store is only removed from the cache.
    /// Returns `true` if the record existed in either place.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable store fails; the tombstone is then
    /// lifted and the cache left untouched. If removing the cached row
    /// fails after the durable delete, the tombstone is still lifted.
    pub fn delete(&self, handle: &mut CachedRecord) -> CoreResult<bool> {
        let pk = self.primary_key_of(handle.record())?;
        let token = self.token(&pk);

        let mut removed = false;
        let marked = !handle.is_new;
        if marked {
            self.tombstones.mark(&token, self.row_ttl())?;
            match self.durable.remove(&pk) {
                Ok(existed) => removed = existed,
                Err(e) => {
                    self.tombstones.clear(&token)?;
                    return Err(e.into());
                }
            }
        }

        let purged = self.purge(&token, &handle.snapshot);
        if marked {
            // Lifted even if the purge failed
            self.tombstones.clear(&token)?;
        }
        removed |= purged?;

        handle.is_new = true;
        handle.dirty = false;
        handle.in_cache = false;
        handle.snapshot = IndexSnapshot::new();
        Ok(removed)
    }

    /// Drops the cached row and every index membership it may hold.
    fn purge(&self, token: &str, known: &IndexSnapshot) -> CoreResult<bool> {
        let snapshot = match self.stored_snapshot(token)? {
            Some(stored) => stored,
            None => known.clone(),
        };
        let existed = self.store.delete(token, &snapshot)?;
        if snapshot != *known {
            self.store.index().remove_all(token, known)?;
        }
        Ok(existed)
    }

    fn stored_snapshot(&self, token: &str) -> CoreResult<Option<IndexSnapshot>> {
        Ok(self
            .store
            .get(token)?
            .map(|entry| self.store.index().resolve(&entry.record)))
    }

    /// Finds a record by primary key, loading it from the durable store on a miss.
    ///
    /// A record loaded from the durable store is cached clean.
    ///
    /// # Errors
    ///
    /// Returns an error if either store fails.
    pub fn find_by_pk(&self, pk: &PrimaryKey) -> CoreResult<Option<CachedRecord>> {
        let token = self.token(pk);
        if self.tombstones.is_deleted(&token)? {
            return Ok(None);
        }
        if let Some(cached) = self.store.load(&token)? {
            return Ok(Some(cached));
        }

        let Some(record) = self.durable.load_by_key(pk)? else {
            return Ok(None);
        };
        // The delete may have started while the durable store was read
        if self.tombstones.is_deleted(&token)? {
            return Ok(None);
        }
        let mut handle = CachedRecord::from_durable(record);
        self.write(&token, &mut handle)?;
        Ok(Some(handle))
    }

    /// Finds a cached record by primary key, without touching the durable store.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache fails.
    pub fn find_cached(&self, pk: &PrimaryKey) -> CoreResult<Option<CachedRecord>> {
        self.find_cached_token(&self.token(pk))
    }

    /// Finds a cached record by its key token.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache fails.
    pub fn find_cached_token(&self, token: &str) -> CoreResult<Option<CachedRecord>> {
        if self.tombstones.is_deleted(token)? {
            return Ok(None);
        }
        self.store.load(token)
    }

    /// Iterates over every cached row of the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the key scan fails.
    pub fn find_all(&self) -> CoreResult<RecordStream<'_>> {
        let tokens = self.store.list_keys()?;
        Ok(RecordStream::new(&self.store, &self.tombstones, tokens, None))
    }

    /// Runs an index query against the cache.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid query, or an error if
    /// the cache fails.
    pub fn find_by_index(&self, query: &IndexQuery) -> CoreResult<RecordStream<'_>> {
        compose(&self.store, &self.tombstones, query)
    }

    /// Loads matching records from the durable store and caches them.
    ///
    /// Rows already cached are returned as cached, unsaved changes included.
    /// Tombstoned rows are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if either store fails.
    pub fn load_matching(&self, criteria: &[(String, Value)]) -> CoreResult<Vec<CachedRecord>> {
        let mut loaded = Vec::new();
        for record in self.durable.find_matching(criteria)? {
            let token = self.token_of(&record)?;
            if self.tombstones.is_deleted(&token)? {
                continue;
            }
            if let Some(cached) = self.store.load(&token)? {
                loaded.push(cached);
                continue;
            }
            let mut handle = CachedRecord::from_durable(record);
            self.write(&token, &mut handle)?;
            loaded.push(handle);
        }
        Ok(loaded)
    }

    /// Lists the values currently present in one index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is undefined or the store fails.
    pub fn index_values(&self, index: &str) -> CoreResult<Vec<String>> {
        self.store.index().index_values(index)
    }

    /// Runs one dump pass.
    ///
    /// `deadline` is an absolute time on this cache's clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails. Durable store
    /// failures on single rows are counted in the outcome instead.
    pub fn dump(&self, deadline: Option<Duration>) -> CoreResult<DumpOutcome> {
        self.sync.run(self, deadline)
    }

    /// Checks whether a cached record will expire before the next guaranteed dump.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is incomplete or the store fails.
    pub fn is_stale(&self, handle: &CachedRecord) -> CoreResult<bool> {
        let token = self.token_of(handle.record())?;
        self.stale_at(&token, self.sync.watermark()?)
    }

    pub(crate) fn stale_at(&self, token: &str, watermark: u64) -> CoreResult<bool> {
        if self.table.row_ttl().is_zero() {
            return Ok(false);
        }
        match self.store.ttl(token)? {
            KeyTtl::Expires(remaining) => {
                let expires_at = self.clock.unix_secs().saturating_add(remaining.as_secs());
                Ok(is_stale(
                    expires_at,
                    watermark,
                    self.table.staleness_scale(),
                    self.table.dump_interval(),
                ))
            }
            KeyTtl::Missing | KeyTtl::Persistent => Ok(false),
        }
    }

    /// The table's capabilities.
    pub fn table(&self) -> &Arc<dyn CachedTable> {
        &self.table
    }

    /// The record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The tombstone set.
    pub fn tombstones(&self) -> &Tombstones {
        &self.tombstones
    }

    /// The dump synchronizer.
    pub fn synchronizer(&self) -> &DumpSynchronizer {
        &self.sync
    }

    /// The durable store.
    pub fn durable(&self) -> &Arc<dyn DurableStore> {
        &self.durable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::durable::{DurableError, MemoryDurableStore};
    use crate::table::TableDef;
    use crate::CoreError;
    use tblcache_kv::{InMemoryKvStore, ManualClock};

    struct Fixture {
        cache: TableCache,
        kv: Arc<InMemoryKvStore>,
        durable: Arc<MemoryDurableStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture(config: TableConfig) -> Fixture {
        let clock = Arc::new(ManualClock::starting_at(0));
        let kv = Arc::new(InMemoryKvStore::with_clock(clock.clone()));
        let durable = Arc::new(MemoryDurableStore::new(["id"]).with_auto_increment("id"));
        let table = TableDef::new("users", ["id"])
            .index_fields("team", ["team"])
            .with_config(config.dump_row_pause(Duration::ZERO));
        let cache = TableCache::new(Arc::new(table), kv.clone(), durable.clone(), clock.clone());
        Fixture {
            cache,
            kv,
            durable,
            clock,
        }
    }

    fn user(id: i64, team: &str) -> Record {
        Record::new().with("id", id).with("team", team)
    }

    fn team(fx: &Fixture, name: &str) -> Vec<String> {
        let mut members = fx.kv.smembers(&format!("tblRedis:{{users}}:index:team:{name}")).unwrap();
        members.sort();
        members
    }

    #[test]
    fn create_writes_dirty_row_and_index() {
        let fx = fixture(TableConfig::new());
        let handle = fx.cache.create(user(1, "red")).unwrap();
        assert!(handle.is_new());
        assert!(handle.is_dirty());
        assert!(handle.in_cache());
        assert_eq!(team(&fx, "red"), vec!["1"]);
        assert!(fx.durable.is_empty());
    }

    #[test]
    fn resave_moves_index_membership() {
        let fx = fixture(TableConfig::new());
        let mut handle = fx.cache.create(user(1, "red")).unwrap();
        handle.set("team", "blue");
        assert!(fx.cache.save(&mut handle).unwrap());

        assert!(team(&fx, "red").is_empty());
        assert_eq!(team(&fx, "blue"), vec!["1"]);
    }

    #[test]
    fn missing_key_field_is_error() {
        let fx = fixture(TableConfig::new());
        let err = fx.cache.create(Record::new().with("team", "red")).unwrap_err();
        assert!(matches!(err, CoreError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn save_durable_picks_up_generated_fields() {
        let fx = fixture(TableConfig::new());
        let mut handle = CachedRecord::new(Record::new().with("id", Value::Null).with("team", "red"));
        fx.cache.save_durable(&mut handle).unwrap();

        assert_eq!(handle.get("id"), Some(&Value::Integer(1)));
        assert!(!handle.is_new());
        assert!(!handle.is_dirty());
        assert!(fx.durable.get(&PrimaryKey::single("id", 1)).is_some());
        // Never cached, so it stays out of the cache
        assert!(!handle.in_cache());
        assert!(fx.cache.find_cached(&PrimaryKey::single("id", 1)).unwrap().is_none());
        assert!(team(&fx, "red").is_empty());
    }

    #[test]
    fn save_durable_rewrites_cached_row_clean() {
        let fx = fixture(TableConfig::new());
        let mut handle = fx.cache.create(user(1, "red")).unwrap();
        fx.cache.save_durable(&mut handle).unwrap();

        assert!(!handle.is_new());
        assert!(!handle.is_dirty());
        assert!(handle.in_cache());
        let cached = fx.cache.find_cached(&PrimaryKey::single("id", 1)).unwrap().unwrap();
        assert!(!cached.is_dirty());
        assert!(!cached.is_new());
        assert_eq!(team(&fx, "red"), vec!["1"]);
    }

    #[test]
    fn save_durable_failure_leaves_handle() {
        let fx = fixture(TableConfig::new());
        let mut handle = fx.cache.create(user(1, "red")).unwrap();
        fx.durable.set_unavailable(true);
        assert!(matches!(
            fx.cache.save_durable(&mut handle),
            Err(CoreError::Durable(DurableError::Unavailable(_)))
        ));
        assert!(handle.is_new());
        assert!(handle.is_dirty());
    }

    #[test]
    fn find_by_pk_falls_back_and_caches_clean() {
        let fx = fixture(TableConfig::new().row_ttl(Duration::from_secs(60)));
        fx.durable.seed(user(5, "red")).unwrap();

        let found = fx.cache.find_by_pk(&PrimaryKey::single("id", 5)).unwrap().unwrap();
        assert!(!found.is_new());
        assert!(!found.is_dirty());
        assert!(found.in_cache());
        assert_eq!(team(&fx, "red"), vec!["5"]);
        assert_eq!(
            fx.kv.ttl("tblRedis:{users}:row:5").unwrap(),
            KeyTtl::Expires(Duration::from_secs(60))
        );

        fx.clock.advance(Duration::from_secs(60));
        assert!(fx.cache.find_cached(&PrimaryKey::single("id", 5)).unwrap().is_none());
        assert!(fx.cache.find_by_pk(&PrimaryKey::single("id", 5)).unwrap().is_some());

        fx.durable.set_unavailable(true);
        assert!(fx.cache.find_by_pk(&PrimaryKey::single("id", 5)).unwrap().is_some());
        assert!(fx.cache.find_by_pk(&PrimaryKey::single("id", 6)).is_err());
    }

    #[test]
    fn find_by_pk_absent_everywhere() {
        let fx = fixture(TableConfig::new());
        assert!(fx.cache.find_by_pk(&PrimaryKey::single("id", 9)).unwrap().is_none());
        assert!(fx.kv.is_empty());
    }

    #[test]
    fn tombstone_blocks_reads_and_saves() {
        let fx = fixture(TableConfig::new());
        fx.durable.seed(user(1, "red")).unwrap();
        let mut handle = fx.cache.find_by_pk(&PrimaryKey::single("id", 1)).unwrap().unwrap();
        fx.cache.tombstones().mark("1", None).unwrap();

        assert!(fx.cache.find_by_pk(&PrimaryKey::single("id", 1)).unwrap().is_none());
        assert!(fx.cache.find_cached_token("1").unwrap().is_none());
        assert!(!fx.cache.save(&mut handle).unwrap());
        assert_eq!(fx.cache.find_all().unwrap().count(), 0);
    }

    #[test]
    fn delete_clears_everything() {
        let fx = fixture(TableConfig::new());
        fx.durable.seed(user(1, "red")).unwrap();
        let mut handle = fx.cache.find_by_pk(&PrimaryKey::single("id", 1)).unwrap().unwrap();
        handle.set("team", "blue");
        fx.cache.save(&mut handle).unwrap();

        assert!(fx.cache.delete(&mut handle).unwrap());
        assert!(fx.durable.is_empty());
        assert!(fx.kv.is_empty());
        assert!(handle.is_new());
        assert!(!handle.in_cache());
    }

    #[test]
    fn delete_of_unpersisted_record_skips_durable_store() {
        let fx = fixture(TableConfig::new());
        let mut handle = fx.cache.create(user(1, "red")).unwrap();
        fx.durable.set_unavailable(true);

        assert!(fx.cache.delete(&mut handle).unwrap());
        assert!(fx.kv.is_empty());
        assert_eq!(fx.durable.remove_count(), 0);
    }

    #[test]
    fn failed_durable_delete_lifts_tombstone() {
        let fx = fixture(TableConfig::new());
        fx.durable.seed(user(1, "red")).unwrap();
        let mut handle = fx.cache.find_by_pk(&PrimaryKey::single("id", 1)).unwrap().unwrap();
        fx.durable.set_unavailable(true);

        assert!(fx.cache.delete(&mut handle).is_err());
        assert!(!fx.cache.tombstones().is_deleted("1").unwrap());
        assert!(fx.cache.find_cached_token("1").unwrap().is_some());
    }

    #[test]
    fn failed_cache_purge_still_lifts_tombstone() {
        let fx = fixture(TableConfig::new());
        fx.durable.seed(user(1, "red")).unwrap();
        let mut handle = fx.cache.find_by_pk(&PrimaryKey::single("id", 1)).unwrap().unwrap();
        // A plain value where the index set should be
        fx.kv.set("tblRedis:{users}:index:team:red", b"x", None).unwrap();

        assert!(fx.cache.delete(&mut handle).is_err());
        assert!(fx.durable.is_empty());
        assert!(!fx.cache.tombstones().is_deleted("1").unwrap());
        let mut again = fx.cache.create(user(1, "blue")).unwrap();
        assert!(again.in_cache());
        assert!(fx.cache.save(&mut again).unwrap());
    }

    #[test]
    fn evict_keeps_durable_copy() {
        let fx = fixture(TableConfig::new());
        fx.durable.seed(user(1, "red")).unwrap();
        fx.cache.find_by_pk(&PrimaryKey::single("id", 1)).unwrap();

        assert!(fx.cache.evict(&PrimaryKey::single("id", 1)).unwrap());
        assert!(fx.kv.is_empty());
        assert_eq!(fx.durable.len(), 1);
        assert!(!fx.cache.evict(&PrimaryKey::single("id", 1)).unwrap());
    }

    #[test]
    fn load_matching_keeps_cached_changes() {
        let fx = fixture(TableConfig::new());
        fx.durable.seed(user(1, "red")).unwrap();
        fx.durable.seed(user(2, "red")).unwrap();
        fx.durable.seed(user(3, "blue")).unwrap();

        let mut first = fx.cache.find_by_pk(&PrimaryKey::single("id", 1)).unwrap().unwrap();
        first.set("note", "local");
        fx.cache.save(&mut first).unwrap();
        fx.cache.tombstones().mark("2", None).unwrap();

        let loaded = fx
            .cache
            .load_matching(&[("team".into(), Value::from("red"))])
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].get("note"), Some(&Value::from("local")));
        assert!(loaded[0].is_dirty());
    }

    #[test]
    fn find_all_and_index_values() {
        let fx = fixture(TableConfig::new());
        for (id, t) in [(1, "red"), (2, "blue"), (3, "red")] {
            fx.cache.create(user(id, t)).unwrap();
        }
        let all: Vec<_> = fx.cache.find_all().unwrap().collect::<CoreResult<_>>().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(fx.cache.index_values("team").unwrap(), vec!["blue", "red"]);
    }

    #[test]
    fn staleness_follows_row_ttl() {
        let fx = fixture(
            TableConfig::new()
                .row_ttl(Duration::from_secs(15))
                .dump_interval(Duration::from_secs(10)),
        );
        let handle = fx.cache.create(user(1, "red")).unwrap();
        assert!(fx.cache.is_stale(&handle).unwrap());

        let fx = fixture(
            TableConfig::new()
                .row_ttl(Duration::from_secs(25))
                .dump_interval(Duration::from_secs(10)),
        );
        let handle = fx.cache.create(user(1, "red")).unwrap();
        assert!(!fx.cache.is_stale(&handle).unwrap());
    }
}
