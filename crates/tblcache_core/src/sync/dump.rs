//! Dump passes.

use crate::cache::TableCache;
use crate::error::{CoreError, CoreResult};
use crate::keys::KeySpace;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tblcache_kv::{Clock, KvStore};
use tracing::{debug, info, warn};

/// Where a dump pass is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DumpState {
    /// No pass is running.
    #[default]
    Idle,
    /// The dump gate is held; the scan has not started.
    Locked,
    /// Rows are being written back.
    Scanning,
}

impl DumpState {
    /// Returns true while a pass holds the gate.
    pub fn is_active(&self) -> bool {
        matches!(self, DumpState::Locked | DumpState::Scanning)
    }
}

/// What one dump pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpOutcome {
    /// Furthest state the pass reached.
    pub state: DumpState,
    /// The table declined the pass; nothing was touched.
    pub declined: bool,
    /// This pass took the dump gate.
    pub gate_acquired: bool,
    /// Rows examined.
    pub scanned: u64,
    /// Dirty rows written to the durable store.
    pub persisted: u64,
    /// Rows that could not be written back or read.
    pub failed: u64,
    /// Stale rows removed from the cache.
    pub evicted: u64,
    /// The deadline stopped the scan early.
    pub truncated: bool,
    /// Watermark after the pass, in Unix seconds.
    pub watermark: u64,
}

/// Runs dump passes for one table.
///
/// The dump gate (`:table:timeout`) limits passes to one per dump interval
/// across every process sharing the store. The watermark
/// (`:table:synchronized`) records the last pass and is read from the store
/// once, then kept in memory.
pub struct DumpSynchronizer {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    keys: KeySpace,
    state: RwLock<DumpState>,
    watermark: RwLock<Option<u64>>,
}

impl DumpSynchronizer {
    /// Creates a synchronizer over the given key space.
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>, keys: KeySpace) -> Self {
        Self {
            kv,
            clock,
            keys,
            state: RwLock::new(DumpState::Idle),
            watermark: RwLock::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> DumpState {
        *self.state.read()
    }

    /// Last synchronization time in Unix seconds (0 if never synchronized).
    ///
    /// # Errors
    ///
    /// Returns an error if the stored watermark cannot be read or parsed.
    pub fn watermark(&self) -> CoreResult<u64> {
        if let Some(cached) = *self.watermark.read() {
            return Ok(cached);
        }
        let loaded = self.load_watermark()?;
        let mut slot = self.watermark.write();
        Ok(*slot.get_or_insert(loaded))
    }

    /// Returns true if no pass has run within the dump interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the key-value store fails.
    pub fn gate_open(&self) -> CoreResult<bool> {
        Ok(!self.kv.exists(&self.keys.timeout())?)
    }

    /// Runs one pass over `cache`.
    ///
    /// `deadline` is an absolute clock time; rows not reached by then are
    /// left for the next pass. The watermark moves forward whenever the
    /// table does not decline, even if another process holds the gate.
    pub(crate) fn run(&self, cache: &TableCache, deadline: Option<Duration>) -> CoreResult<DumpOutcome> {
        let table = cache.table();
        let previous = self.watermark()?;
        let mut outcome = DumpOutcome {
            watermark: previous,
            ..DumpOutcome::default()
        };

        if !table.ready_for_dump() {
            debug!(table = table.table_name(), "table declined dump");
            outcome.declined = true;
            return Ok(outcome);
        }

        let interval = table.dump_interval();
        if !interval.is_zero() && !self.state().is_active() {
            if self.kv.set_nx(&self.keys.timeout(), b"1", Some(interval))? {
                debug!(table = table.table_name(), "dump gate acquired");
                outcome.gate_acquired = true;
                self.set_state(DumpState::Locked);
                outcome.state = DumpState::Locked;

                let scanned = self.scan(cache, previous, deadline, &mut outcome);
                self.set_state(DumpState::Idle);
                scanned?;

                self.kv.set(&self.keys.timeout(), b"1", Some(interval))?;
            } else {
                debug!(table = table.table_name(), "dump gate held elsewhere, skipping scan");
            }
        }

        outcome.watermark = self.advance_watermark(previous)?;
        info!(
            table = table.table_name(),
            scanned = outcome.scanned,
            persisted = outcome.persisted,
            failed = outcome.failed,
            evicted = outcome.evicted,
            truncated = outcome.truncated,
            watermark = outcome.watermark,
            "dump pass finished"
        );
        Ok(outcome)
    }

    fn scan(
        &self,
        cache: &TableCache,
        watermark: u64,
        deadline: Option<Duration>,
        outcome: &mut DumpOutcome,
    ) -> CoreResult<()> {
        self.set_state(DumpState::Scanning);
        outcome.state = DumpState::Scanning;

        let table = cache.table();
        let pause = table.config().dump_row_pause;

        for token in cache.store().list_keys()? {
            if deadline.is_some_and(|d| self.clock.now() >= d) {
                outcome.truncated = true;
                break;
            }
            if cache.tombstones().is_deleted(&token)? {
                continue;
            }
            let mut handle = match cache.store().load(&token) {
                Ok(Some(handle)) => handle,
                Ok(None) => continue,
                Err(e @ CoreError::CorruptEntry { .. }) => {
                    warn!(table = table.table_name(), token = %token, error = %e, "skipping unreadable row");
                    outcome.failed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            outcome.scanned += 1;

            if handle.is_dirty() {
                if let Err(e) = cache.save_durable(&mut handle) {
                    warn!(table = table.table_name(), token = %token, error = %e, "failed to write back row");
                    outcome.failed += 1;
                    self.clock.sleep(pause);
                    continue;
                }
                outcome.persisted += 1;
            }

            if cache.stale_at(&token, watermark)? {
                cache.evict_record(&mut handle)?;
                outcome.evicted += 1;
            }
            self.clock.sleep(pause);
        }
        Ok(())
    }

    fn set_state(&self, state: DumpState) {
        *self.state.write() = state;
    }

    fn load_watermark(&self) -> CoreResult<u64> {
        let key = self.keys.synchronized();
        match self.kv.get(&key)? {
            None => Ok(0),
            Some(bytes) => std::str::from_utf8(&bytes)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| CoreError::corrupt_entry(key, "watermark is not a Unix timestamp")),
        }
    }

    fn advance_watermark(&self, previous: u64) -> CoreResult<u64> {
        let next = previous.max(self.clock.unix_secs());
        self.kv
            .set(&self.keys.synchronized(), next.to_string().as_bytes(), None)?;
        *self.watermark.write() = Some(next);
        Ok(next)
    }
}
