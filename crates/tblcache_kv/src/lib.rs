//! # tblcache KV
//!
//! Key-value store trait and implementations for tblcache.
//!
//! This crate provides the lowest-level abstraction the cache is built on.
//! A key-value store holds three kinds of values under string keys:
//! opaque byte strings, unordered string sets and flat string hashes.
//! It knows nothing about rows, indexes or tables.
//!
//! ## Design Principles
//!
//! - Every individual operation is atomic; multi-step sequences are not
//! - Keys may carry a time-to-live; a zero TTL means "no expiry"
//! - Set algebra (union/intersect/diff) is evaluated store-side into a destination key
//! - Create-if-absent (`set_nx`) is the only coordination primitive
//! - Must be `Send + Sync`: one store is shared by every table handle in a process
//!
//! ## Available Stores
//!
//! - [`InMemoryKvStore`] - For testing and single-process deployments
//!
//! ## Example
//!
//! ```rust
//! use tblcache_kv::{KvStore, InMemoryKvStore};
//!
//! let store = InMemoryKvStore::new();
//! store.set("greeting", b"hello", None).unwrap();
//! assert_eq!(store.get("greeting").unwrap(), Some(b"hello".to_vec()));
//!
//! store.sadd("colors", "red").unwrap();
//! store.sadd("colors", "blue").unwrap();
//! assert_eq!(store.smembers("colors").unwrap().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod clock;
mod error;
mod memory;
mod pattern;

pub use backend::{KeyTtl, KvStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{KvError, KvResult};
pub use memory::InMemoryKvStore;
pub use pattern::{escape_glob, glob_match};
