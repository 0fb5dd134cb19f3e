//! Workload replay with a model of the expected cache state.

use crate::fixtures::{user, TestCache};
use crate::generators::WriteOp;
use std::collections::BTreeMap;
use tblcache_core::{join_values, PrimaryKey, Value};

/// Expected `(team, status)` of every cached `users` row.
#[derive(Debug, Default)]
pub struct UsersModel {
    rows: BTreeMap<i64, (String, String)>,
}

impl UsersModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one step to the cache and the model.
    pub fn apply(&mut self, tc: &TestCache, op: &WriteOp) {
        match op {
            WriteOp::Save { id, team, status } => {
                let pk = PrimaryKey::single("id", *id);
                let mut handle = match tc.cache.find_by_pk(&pk).expect("Failed to find user") {
                    Some(handle) => handle,
                    None => tblcache_core::CachedRecord::new(user(*id, team, status)),
                };
                handle.set("team", team.as_str());
                handle.set("status", status.as_str());
                assert!(tc.cache.save(&mut handle).expect("Failed to save user"));
                self.rows.insert(*id, (team.clone(), status.clone()));
            }
            WriteOp::Delete { id } => {
                let pk = PrimaryKey::single("id", *id);
                if let Some(mut handle) = tc.cache.find_by_pk(&pk).expect("Failed to find user") {
                    tc.cache.delete(&mut handle).expect("Failed to delete user");
                }
                self.rows.remove(id);
            }
            WriteOp::Dump => {
                tc.cache.dump(None).expect("Dump failed");
            }
            WriteOp::Evict { id } => {
                let pk = PrimaryKey::single("id", *id);
                tc.cache.evict(&pk).expect("Failed to evict user");
                // Unsaved changes are lost; the durable copy is what remains
                match tc.durable.get(&pk) {
                    Some(stored) => {
                        let text = |field: &str| {
                            stored
                                .get(field)
                                .and_then(Value::as_text)
                                .unwrap_or_default()
                                .to_string()
                        };
                        self.rows.insert(*id, (text("team"), text("status")));
                    }
                    None => {
                        self.rows.remove(id);
                    }
                }
            }
        }
    }

    /// Expected rows.
    pub fn rows(&self) -> &BTreeMap<i64, (String, String)> {
        &self.rows
    }

    /// Checks that every modeled row reads back with its modeled values,
    /// and that no other id in `0..ids` exists.
    pub fn assert_rows(&self, tc: &TestCache, ids: i64) {
        for id in 0..ids {
            let found = tc
                .cache
                .find_by_pk(&PrimaryKey::single("id", id))
                .expect("Failed to find user");
            match (self.rows.get(&id), found) {
                (Some((team, status)), Some(row)) => {
                    assert_eq!(row.get("team").and_then(Value::as_text), Some(team.as_str()));
                    assert_eq!(row.get("status").and_then(Value::as_text), Some(status.as_str()));
                }
                (None, None) => {}
                (want, got) => panic!("row {id}: expected {want:?}, found {got:?}"),
            }
        }
    }

    /// Checks that every index entry holds exactly the cached rows whose
    /// values produce it.
    pub fn assert_indexes_consistent(&self, tc: &TestCache) {
        let mut expected: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
        for row in tc.cache.find_all().expect("Failed to scan rows") {
            let row = row.expect("Failed to load row");
            let id = row.get("id").and_then(Value::as_integer).expect("Row without id");
            let team = row.get("team").cloned().unwrap_or(Value::Null);
            let status = row.get("status").cloned().unwrap_or(Value::Null);
            for (index, value) in [
                ("team", join_values([&team], "_")),
                ("status", join_values([&status], "_")),
                ("team_status", join_values([&team, &status], "_")),
            ] {
                expected
                    .entry((index.to_string(), value))
                    .or_default()
                    .push(id.to_string());
            }
        }

        for index in ["team", "status", "team_status"] {
            for value in tc.cache.index_values(index).expect("Failed to list index values") {
                let mut want = expected
                    .remove(&(index.to_string(), value.clone()))
                    .unwrap_or_default();
                want.sort();
                assert_eq!(tc.members(index, &value), want, "index {index}:{value}");
            }
        }
        assert!(expected.is_empty(), "missing index entries: {expected:?}");
    }
}
