//! Test fixtures and cache helpers.
//!
//! Provides ready-made tables, a harness bundling a cache with its
//! in-memory collaborators, and a durable store that can run code in the
//! middle of a delete.

use parking_lot::Mutex;
use std::sync::{Arc, Once};
use std::time::Duration;
use tblcache_codec::Value;
use tblcache_core::{
    CachedTable, DurableResult, DurableStore, IndexDefinitions, MemoryDurableStore, PrimaryKey,
    Record, TableCache, TableConfig, TableDef,
};
use tblcache_kv::{InMemoryKvStore, ManualClock};

static TRACING: Once = Once::new();

/// Installs a test subscriber once per process.
///
/// Filtering follows `RUST_LOG`, defaulting to `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Parses a table configuration from JSON.
pub fn config_from_json(json: &str) -> TableConfig {
    serde_json::from_str(json).expect("Invalid table config JSON")
}

/// A `users` table keyed by `id`, indexed by `status`, `team` and `team_status`.
pub fn users_table(config: TableConfig) -> TableDef {
    TableDef::new("users", ["id"])
        .index_fields("status", ["status"])
        .index_fields("team", ["team"])
        .index_fields("team_status", ["team", "status"])
        .with_config(config.dump_row_pause(Duration::ZERO))
        .registered_as("UserTable")
}

/// Builds a `users` row.
pub fn user(id: i64, team: &str, status: &str) -> Record {
    Record::new()
        .with("id", id)
        .with("team", team)
        .with("status", status)
}

/// A table keyed by `(uid, day)` with a computed budget index.
///
/// Dumping can be switched off at runtime, the way a table would decline
/// dumps while a maintenance job runs.
pub struct CampaignTable {
    primary_key: Vec<String>,
    indexes: IndexDefinitions,
    config: TableConfig,
    paused: std::sync::atomic::AtomicBool,
}

impl CampaignTable {
    /// Creates the table.
    pub fn new(config: TableConfig) -> Self {
        let indexes = IndexDefinitions::new()
            .with_fields("owner", ["uid"])
            .with_computed("budget_band", |record| {
                let budget = record.get("budget").and_then(Value::as_integer)?;
                Some(if budget >= 1_000 { "high" } else { "low" }.to_string())
            });
        Self {
            primary_key: vec!["uid".to_string(), "day".to_string()],
            indexes,
            config: config.dump_row_pause(Duration::ZERO),
            paused: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Makes the table decline (or accept) dump passes.
    pub fn pause_dumps(&self, paused: bool) {
        self.paused
            .store(paused, std::sync::atomic::Ordering::SeqCst);
    }

    /// Builds a campaign row.
    pub fn row(uid: i64, day: &str, budget: Option<i64>) -> Record {
        let record = Record::new().with("uid", uid).with("day", day);
        match budget {
            Some(b) => record.with("budget", b),
            None => record,
        }
    }
}

impl CachedTable for CampaignTable {
    fn table_name(&self) -> &str {
        "campaigns"
    }

    fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    fn index_definitions(&self) -> &IndexDefinitions {
        &self.indexes
    }

    fn config(&self) -> &TableConfig {
        &self.config
    }

    fn ready_for_dump(&self) -> bool {
        !self.paused.load(std::sync::atomic::Ordering::SeqCst)
    }
}

type RemoveHook = Box<dyn Fn(&PrimaryKey) + Send + Sync>;

/// A durable store that calls a hook before each delete.
///
/// Lets a test run a concurrent read at the exact moment the cache is
/// waiting on the durable store.
pub struct HookedDurableStore {
    inner: MemoryDurableStore,
    on_remove: Mutex<Option<RemoveHook>>,
}

impl HookedDurableStore {
    /// Wraps an in-memory store.
    pub fn new(inner: MemoryDurableStore) -> Self {
        Self {
            inner,
            on_remove: Mutex::new(None),
        }
    }

    /// Sets the hook.
    pub fn on_remove(&self, hook: impl Fn(&PrimaryKey) + Send + Sync + 'static) {
        *self.on_remove.lock() = Some(Box::new(hook));
    }

    /// The wrapped store.
    pub fn inner(&self) -> &MemoryDurableStore {
        &self.inner
    }
}

impl DurableStore for HookedDurableStore {
    fn load_by_key(&self, pk: &PrimaryKey) -> DurableResult<Option<Record>> {
        self.inner.load_by_key(pk)
    }

    fn persist(&self, record: &Record) -> DurableResult<Record> {
        self.inner.persist(record)
    }

    fn remove(&self, pk: &PrimaryKey) -> DurableResult<bool> {
        if let Some(hook) = self.on_remove.lock().as_ref() {
            hook(pk);
        }
        self.inner.remove(pk)
    }

    fn find_matching(&self, criteria: &[(String, Value)]) -> DurableResult<Vec<Record>> {
        self.inner.find_matching(criteria)
    }
}

/// A table cache wired to in-memory collaborators and a manual clock.
pub struct TestCache {
    /// The cache under test.
    pub cache: Arc<TableCache>,
    /// The shared key-value store.
    pub kv: Arc<InMemoryKvStore>,
    /// The durable store.
    pub durable: Arc<MemoryDurableStore>,
    /// The clock driving expiry and deadlines.
    pub clock: Arc<ManualClock>,
}

impl TestCache {
    /// Creates a harness for `table`, with the clock at Unix second `start`.
    pub fn new(table: Arc<dyn CachedTable>, start: u64) -> Self {
        let clock = Arc::new(ManualClock::starting_at(start));
        let kv = Arc::new(InMemoryKvStore::with_clock(clock.clone()));
        Self::with_kv(table, kv, clock)
    }

    /// Creates a harness sharing an existing store and clock.
    pub fn with_kv(table: Arc<dyn CachedTable>, kv: Arc<InMemoryKvStore>, clock: Arc<ManualClock>) -> Self {
        let durable = Arc::new(MemoryDurableStore::new(table.primary_key().to_vec()));
        let cache = Arc::new(TableCache::new(table, kv.clone(), durable.clone(), clock.clone()));
        Self {
            cache,
            kv,
            durable,
            clock,
        }
    }

    /// Creates a harness for [`users_table`].
    pub fn users(config: TableConfig) -> Self {
        Self::new(Arc::new(users_table(config)), 0)
    }

    /// Saves a new `users` row to the cache.
    pub fn add_user(&self, id: i64, team: &str, status: &str) {
        self.cache
            .create(user(id, team, status))
            .expect("Failed to create user");
    }

    /// Members of one index entry, sorted.
    pub fn members(&self, index: &str, value: &str) -> Vec<String> {
        let table = self.cache.table().table_name();
        let key = format!("tblRedis:{{{table}}}:index:{index}:{value}");
        let mut members = tblcache_kv::KvStore::smembers(self.kv.as_ref(), &key)
            .expect("Failed to read index entry");
        members.sort();
        members
    }

    /// Every key currently in the store, sorted.
    pub fn all_keys(&self) -> Vec<String> {
        tblcache_kv::KvStore::keys(self.kv.as_ref(), "*").expect("Failed to scan keys")
    }
}

/// Sorted `id` values of a query result.
pub fn ids(records: &[tblcache_core::CachedRecord]) -> Vec<i64> {
    let mut ids: Vec<i64> = records
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_integer))
        .collect();
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_json_defaults() {
        let config = config_from_json(r#"{"row_ttl": 60, "dump_interval": 10}"#);
        assert_eq!(config.row_ttl, Duration::from_secs(60));
        assert_eq!(config.staleness_scale, 2.0);
    }

    #[test]
    fn campaign_budget_band() {
        let table = CampaignTable::new(TableConfig::new());
        let defs = table.index_definitions();
        let snapshot = defs.resolve(&CampaignTable::row(1, "2024-01-01", Some(5_000)), "_");
        assert_eq!(snapshot.get("budget_band"), Some("high"));
        assert_eq!(snapshot.get("owner"), Some("1"));

        let snapshot = defs.resolve(&CampaignTable::row(1, "2024-01-01", None), "_");
        assert_eq!(snapshot.get("budget_band"), None);
    }

    #[test]
    fn campaign_dump_toggle() {
        let table = CampaignTable::new(TableConfig::new());
        assert!(table.ready_for_dump());
        table.pause_dumps(true);
        assert!(!table.ready_for_dump());
    }

    #[test]
    fn harness_adds_users() {
        let tc = TestCache::users(TableConfig::new());
        tc.add_user(1, "red", "open");
        assert_eq!(tc.members("team", "red"), vec!["1"]);
        assert!(tc.all_keys().contains(&"tblRedis:{users}:row:1".to_string()));
    }
}
