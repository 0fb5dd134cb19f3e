//! Synchronizer process driver.

use crate::error::CoreResult;
use crate::registry::TableRegistry;
use crate::sync::DumpOutcome;
use std::sync::Arc;
use std::time::Duration;
use tblcache_kv::{Clock, KvStore};
use tracing::{info, warn};

/// Store-wide flag that pauses every synchronizer.
pub const SUSPEND_KEY: &str = "cmd:redistables:stop";

/// Result of synchronizing every registered table.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Outcome per table, in name order.
    pub tables: Vec<(String, DumpOutcome)>,
    /// Tables whose pass failed, with the error message.
    pub failed: Vec<(String, String)>,
    /// Nothing ran because synchronization is suspended.
    pub suspended: bool,
}

impl SyncReport {
    /// Total rows written to durable stores.
    pub fn persisted(&self) -> u64 {
        self.tables.iter().map(|(_, o)| o.persisted).sum()
    }
}

/// Drives dump passes over the registered tables.
pub struct SyncRunner {
    registry: Arc<TableRegistry>,
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl SyncRunner {
    /// Creates a runner.
    pub fn new(registry: Arc<TableRegistry>, kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            kv,
            clock,
        }
    }

    /// Pauses synchronization in every process sharing the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn suspend(&self) -> CoreResult<()> {
        self.kv.set(SUSPEND_KEY, b"1", None)?;
        info!("synchronization suspended");
        Ok(())
    }

    /// Lifts a suspension.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn resume(&self) -> CoreResult<()> {
        self.kv.delete(SUSPEND_KEY)?;
        info!("synchronization resumed");
        Ok(())
    }

    /// Checks the suspension flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn is_suspended(&self) -> CoreResult<bool> {
        Ok(self.kv.exists(SUSPEND_KEY)?)
    }

    /// Runs one pass over a single table within `budget`.
    ///
    /// Returns `None` while suspended.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is unknown or its pass fails.
    pub fn synchronize_table(&self, name: &str, budget: Option<Duration>) -> CoreResult<Option<DumpOutcome>> {
        if self.is_suspended()? {
            return Ok(None);
        }
        let cache = self.registry.get(name)?;
        cache.dump(self.deadline(budget)).map(Some)
    }

    /// Runs one pass over every registered table, sharing one budget.
    ///
    /// A failing table is reported and does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns an error only if the suspension flag cannot be read.
    pub fn synchronize_all(&self, budget: Option<Duration>) -> CoreResult<SyncReport> {
        let mut report = SyncReport::default();
        if self.is_suspended()? {
            info!("synchronization suspended, skipping pass");
            report.suspended = true;
            return Ok(report);
        }

        let deadline = self.deadline(budget);
        for name in self.registry.registered_names() {
            let Some(cache) = self.registry.lookup(&name) else {
                continue;
            };
            match cache.dump(deadline) {
                Ok(outcome) => report.tables.push((name, outcome)),
                Err(e) => {
                    warn!(table = %name, error = %e, "dump pass failed");
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        info!(
            tables = report.tables.len(),
            failed = report.failed.len(),
            persisted = report.persisted(),
            "synchronization pass finished"
        );
        Ok(report)
    }

    fn deadline(&self, budget: Option<Duration>) -> Option<Duration> {
        budget.map(|b| self.clock.now().saturating_add(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TableCache;
    use crate::config::TableConfig;
    use crate::durable::MemoryDurableStore;
    use crate::record::Record;
    use crate::table::TableDef;
    use tblcache_kv::{InMemoryKvStore, ManualClock};

    struct Fixture {
        runner: SyncRunner,
        registry: Arc<TableRegistry>,
        kv: Arc<InMemoryKvStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::starting_at(100));
        let kv = Arc::new(InMemoryKvStore::with_clock(clock.clone()));
        let registry = Arc::new(TableRegistry::new(kv.clone(), "tblRedis:"));
        let runner = SyncRunner::new(registry.clone(), kv.clone(), clock.clone());
        Fixture {
            runner,
            registry,
            kv,
            clock,
        }
    }

    fn register(fx: &Fixture, name: &str, durable: Arc<MemoryDurableStore>) -> Arc<TableCache> {
        let config = TableConfig::new()
            .dump_interval(Duration::from_secs(60))
            .dump_row_pause(Duration::from_secs(1));
        let cache = Arc::new(TableCache::new(
            Arc::new(TableDef::new(name, ["id"]).with_config(config)),
            fx.kv.clone(),
            durable,
            fx.clock.clone(),
        ));
        fx.registry.register(cache.clone()).unwrap();
        cache
    }

    #[test]
    fn suspension_skips_everything() {
        let fx = fixture();
        let durable = Arc::new(MemoryDurableStore::new(["id"]));
        let cache = register(&fx, "users", durable.clone());
        cache.create(Record::new().with("id", 1)).unwrap();

        fx.runner.suspend().unwrap();
        assert!(fx.runner.is_suspended().unwrap());
        assert!(fx.runner.synchronize_all(None).unwrap().suspended);
        assert!(fx.runner.synchronize_table("users", None).unwrap().is_none());
        assert!(durable.is_empty());

        fx.runner.resume().unwrap();
        let outcome = fx.runner.synchronize_table("users", None).unwrap().unwrap();
        assert_eq!(outcome.persisted, 1);
    }

    #[test]
    fn unknown_table_is_error() {
        let fx = fixture();
        assert!(fx.runner.synchronize_table("ghost", None).is_err());
    }

    #[test]
    fn one_failing_table_does_not_stop_others() {
        let fx = fixture();
        let good = Arc::new(MemoryDurableStore::new(["id"]));
        register(&fx, "a", good.clone()).create(Record::new().with("id", 1)).unwrap();
        let bad = register(&fx, "b", Arc::new(MemoryDurableStore::new(["id"])));
        bad.create(Record::new().with("id", 1)).unwrap();
        fx.kv.set("tblRedis:{b}:table:synchronized", b"garbage", None).unwrap();

        let report = fx.runner.synchronize_all(None).unwrap();
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "b");
        assert_eq!(report.persisted(), 1);
        assert_eq!(good.len(), 1);
    }

    #[test]
    fn budget_is_shared_across_tables() {
        let fx = fixture();
        let first = register(&fx, "a", Arc::new(MemoryDurableStore::new(["id"])));
        let second = register(&fx, "b", Arc::new(MemoryDurableStore::new(["id"])));
        for id in 0..3 {
            first.create(Record::new().with("id", id)).unwrap();
            second.create(Record::new().with("id", id)).unwrap();
        }

        let report = fx.runner.synchronize_all(Some(Duration::from_secs(2))).unwrap();
        let (_, a) = &report.tables[0];
        let (_, b) = &report.tables[1];
        assert_eq!(a.scanned, 2);
        assert!(a.truncated);
        assert_eq!(b.scanned, 0);
        assert!(b.truncated);
    }
}
