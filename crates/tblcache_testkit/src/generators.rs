//! Property-based test generators using proptest.

use proptest::prelude::*;
use tblcache_codec::Value;
use tblcache_core::Record;

/// Strategy for scalar attribute values, including values that render
/// like sentinels or like other types.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        prop::sample::select(vec!["", "@NULL@", "@TRUE@", "false", "0", "null"])
            .prop_map(Value::from),
        "[a-z0-9 ]{0,12}".prop_map(Value::from),
    ]
}

/// Strategy for records with an integer `id` and a few scalar fields.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    (
        0i64..1_000,
        prop::collection::btree_map("[a-z]{1,8}", scalar_value_strategy(), 0..6),
    )
        .prop_map(|(id, fields)| {
            let mut record: Record = fields.into_iter().collect();
            record.set("id", id);
            record
        })
}

/// One step of a write workload against the `users` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Save a row with these values, creating it if needed.
    Save {
        /// Row id.
        id: i64,
        /// `team` value.
        team: String,
        /// `status` value.
        status: String,
    },
    /// Delete a row if it exists.
    Delete {
        /// Row id.
        id: i64,
    },
    /// Run a dump pass.
    Dump,
    /// Evict a row from the cache only.
    Evict {
        /// Row id.
        id: i64,
    },
}

/// Strategy for a single workload step over a small id space, so that
/// steps often hit the same rows.
pub fn write_op_strategy() -> impl Strategy<Value = WriteOp> {
    let id = 0i64..6;
    let team = prop::sample::select(vec!["red", "blue", "green"]).prop_map(str::to_string);
    let status = prop::sample::select(vec!["open", "closed"]).prop_map(str::to_string);
    prop_oneof![
        6 => (id.clone(), team, status).prop_map(|(id, team, status)| WriteOp::Save { id, team, status }),
        2 => id.clone().prop_map(|id| WriteOp::Delete { id }),
        1 => Just(WriteOp::Dump),
        1 => id.prop_map(|id| WriteOp::Evict { id }),
    ]
}

/// Strategy for workloads.
pub fn workload_strategy(max_len: usize) -> impl Strategy<Value = Vec<WriteOp>> {
    prop::collection::vec(write_op_strategy(), 1..max_len)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 128,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 512,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
