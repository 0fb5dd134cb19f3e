//! # tblcache Testkit
//!
//! Test utilities for tblcache.
//!
//! This crate provides:
//! - Fixture tables and a cache harness over in-memory collaborators
//! - Property-based test generators using proptest
//! - Workload replay against a model of the expected cache state
//! - A tracing subscriber for test output
//!
//! ## Usage
//!
//! ```rust
//! use tblcache_core::{IndexQuery, TableConfig};
//! use tblcache_testkit::prelude::*;
//!
//! let tc = TestCache::users(TableConfig::new());
//! tc.add_user(1, "red", "open");
//! tc.add_user(2, "blue", "open");
//!
//! let open: Vec<_> = tc
//!     .cache
//!     .find_by_index(&IndexQuery::new("status", "open"))
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(ids(&open), vec![1, 2]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod workload;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::workload::*;
}

pub use fixtures::*;
pub use generators::*;
pub use workload::*;
