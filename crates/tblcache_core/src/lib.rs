//! # tblcache Core
//!
//! Write-behind table cache over a key-value store.
//!
//! This crate provides:
//! - A serialized record store with typed round-trips
//! - Secondary indexes kept as sets of primary key tokens
//! - Index queries composed with union, intersection and difference
//! - Tombstones guarding deletes against concurrent reloads
//! - Dump passes writing dirty rows back to a durable store
//! - A table registry and a runner for synchronizer processes
//!
//! ## Key Layout
//!
//! Every key of a table lives under `{prefix}{table}` with literal braces
//! around the table name; see [`keys`] for the full list.
//!
//! ## Concurrency
//!
//! Every key-value operation is atomic; multi-step sequences are not.
//! Workers coordinate only through the store: the dump gate bounds
//! concurrent dump passes, tombstones bound concurrent deletes and reads.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod durable;
mod error;
mod index;
pub mod keys;
mod record;
mod registry;
mod runner;
mod store;
pub mod sync;
mod table;
mod tombstone;
mod types;

pub use cache::TableCache;
pub use config::{TableConfig, DEFAULT_FIELD_DELIMITER, DEFAULT_KEY_PREFIX};
pub use durable::{DurableError, DurableResult, DurableStore, MemoryDurableStore};
pub use error::{CoreError, CoreResult};
pub use index::{
    IndexDefinition, IndexDefinitions, IndexFn, IndexManager, IndexOp, IndexQuery, IndexUse,
    RecordStream,
};
pub use keys::KeySpace;
pub use record::{CacheEntry, CachedRecord, Record};
pub use registry::TableRegistry;
pub use runner::{SyncReport, SyncRunner, SUSPEND_KEY};
pub use store::RecordStore;
pub use sync::{DumpOutcome, DumpState, DumpSynchronizer};
pub use table::{CachedTable, TableDef};
pub use tombstone::Tombstones;
pub use types::{
    join_rendered, join_values, render_value, IndexSnapshot, PrimaryKey, FALSE_SENTINEL, NULL_SENTINEL,
    TRUE_SENTINEL,
};

// Re-export the lower layers so callers need one dependency.
pub use tblcache_codec::Value;
pub use tblcache_kv::{Clock, InMemoryKvStore, KeyTtl, KvStore, ManualClock, SystemClock};
