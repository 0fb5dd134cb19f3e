//! In-memory key-value store for testing.

use crate::backend::{KeyTtl, KvStore};
use crate::clock::{Clock, SystemClock};
use crate::error::{KvError, KvResult};
use crate::pattern::glob_match;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Data {
    Bytes(Vec<u8>),
    Set(BTreeSet<String>),
    Hash(BTreeMap<String, String>),
}

#[derive(Debug, Clone)]
struct Slot {
    data: Data,
    /// Absolute expiry, measured on the store's clock.
    expires_at: Option<Duration>,
}

impl Slot {
    fn persistent(data: Data) -> Self {
        Self {
            data,
            expires_at: None,
        }
    }

    fn is_live(&self, now: Duration) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// An in-memory key-value store.
///
/// This store keeps every key in a single map guarded by a lock, which
/// makes each method atomic with respect to every other. It is suitable for:
/// - Unit tests
/// - Integration tests
/// - Single-process deployments that don't need a shared server
///
/// Expired keys are dropped lazily: reads ignore them and writes purge them.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use tblcache_kv::{KvStore, InMemoryKvStore};
///
/// let store = InMemoryKvStore::new();
/// assert!(store.set_nx("lock", b"1", None).unwrap());
/// assert!(!store.set_nx("lock", b"1", None).unwrap());
/// ```
#[derive(Debug)]
pub struct InMemoryKvStore {
    slots: RwLock<HashMap<String, Slot>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKvStore {
    /// Creates an empty store driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store driven by the given clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.slots.read().values().filter(|s| s.is_live(now)).count()
    }

    /// Returns true if no live keys exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every key.
    pub fn clear(&self) {
        self.slots.write().clear();
    }

    fn expiry(&self, ttl: Option<Duration>) -> Option<Duration> {
        ttl.filter(|d| !d.is_zero()).map(|d| self.clock.now() + d)
    }

    /// Reads a live set without cloning the whole map.
    fn read_set(&self, key: &str) -> KvResult<BTreeSet<String>> {
        let now = self.clock.now();
        let slots = self.slots.read();
        match slots.get(key).filter(|s| s.is_live(now)) {
            None => Ok(BTreeSet::new()),
            Some(Slot {
                data: Data::Set(set),
                ..
            }) => Ok(set.clone()),
            Some(_) => Err(KvError::wrong_type(key, "set")),
        }
    }

    /// Applies `f` to the live slot at `key`, purging it first if it has expired.
    fn with_live_slot<R>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<String, Slot>, Duration) -> KvResult<R>,
    ) -> KvResult<R> {
        let now = self.clock.now();
        let mut slots = self.slots.write();
        if slots.get(key).is_some_and(|s| !s.is_live(now)) {
            slots.remove(key);
        }
        f(&mut slots, now)
    }

    /// Combines the sets at `keys` and stores the result at `dest`, all
    /// under one write lock so no other call sees or changes a source
    /// halfway through.
    fn combine_into(
        &self,
        dest: &str,
        keys: &[&str],
        combine: impl Fn(BTreeSet<String>, &BTreeSet<String>) -> BTreeSet<String>,
    ) -> KvResult<usize> {
        let now = self.clock.now();
        let empty = BTreeSet::new();
        let mut slots = self.slots.write();

        let mut sources = Vec::with_capacity(keys.len());
        for key in keys {
            match slots.get(*key).filter(|s| s.is_live(now)) {
                None => sources.push(&empty),
                Some(Slot {
                    data: Data::Set(set),
                    ..
                }) => sources.push(set),
                Some(_) => return Err(KvError::wrong_type(*key, "set")),
            }
        }
        let mut sources = sources.into_iter();
        let result = match sources.next() {
            None => BTreeSet::new(),
            Some(first) => sources.fold(first.clone(), combine),
        };

        let count = result.len();
        if result.is_empty() {
            slots.remove(dest);
        } else {
            slots.insert(dest.to_string(), Slot::persistent(Data::Set(result)));
        }
        Ok(count)
    }
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        let now = self.clock.now();
        let slots = self.slots.read();
        match slots.get(key).filter(|s| s.is_live(now)) {
            None => Ok(None),
            Some(Slot {
                data: Data::Bytes(bytes),
                ..
            }) => Ok(Some(bytes.clone())),
            Some(_) => Err(KvError::wrong_type(key, "string")),
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> KvResult<()> {
        let slot = Slot {
            data: Data::Bytes(value.to_vec()),
            expires_at: self.expiry(ttl),
        };
        self.slots.write().insert(key.to_string(), slot);
        Ok(())
    }

    fn set_nx(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> KvResult<bool> {
        let expires_at = self.expiry(ttl);
        self.with_live_slot(key, |slots, _| {
            if slots.contains_key(key) {
                return Ok(false);
            }
            slots.insert(
                key.to_string(),
                Slot {
                    data: Data::Bytes(value.to_vec()),
                    expires_at,
                },
            );
            Ok(true)
        })
    }

    fn delete(&self, key: &str) -> KvResult<bool> {
        let now = self.clock.now();
        Ok(self
            .slots
            .write()
            .remove(key)
            .is_some_and(|s| s.is_live(now)))
    }

    fn exists(&self, key: &str) -> KvResult<bool> {
        let now = self.clock.now();
        Ok(self.slots.read().get(key).is_some_and(|s| s.is_live(now)))
    }

    fn ttl(&self, key: &str) -> KvResult<KeyTtl> {
        let now = self.clock.now();
        let slots = self.slots.read();
        Ok(match slots.get(key).filter(|s| s.is_live(now)) {
            None => KeyTtl::Missing,
            Some(Slot {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Slot {
                expires_at: Some(at),
                ..
            }) => KeyTtl::Expires(at.saturating_sub(now)),
        })
    }

    fn keys(&self, pattern: &str) -> KvResult<Vec<String>> {
        let now = self.clock.now();
        let slots = self.slots.read();
        let mut keys = Vec::new();
        for (key, slot) in slots.iter() {
            if slot.is_live(now) && glob_match(pattern, key)? {
                keys.push(key.clone());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn sadd(&self, key: &str, member: &str) -> KvResult<bool> {
        self.with_live_slot(key, |slots, _| {
            let slot = slots
                .entry(key.to_string())
                .or_insert_with(|| Slot::persistent(Data::Set(BTreeSet::new())));
            match &mut slot.data {
                Data::Set(set) => Ok(set.insert(member.to_string())),
                _ => Err(KvError::wrong_type(key, "set")),
            }
        })
    }

    fn srem(&self, key: &str, member: &str) -> KvResult<bool> {
        self.with_live_slot(key, |slots, _| {
            let Some(slot) = slots.get_mut(key) else {
                return Ok(false);
            };
            let (removed, now_empty) = match &mut slot.data {
                Data::Set(set) => (set.remove(member), set.is_empty()),
                _ => return Err(KvError::wrong_type(key, "set")),
            };
            if now_empty {
                slots.remove(key);
            }
            Ok(removed)
        })
    }

    fn smembers(&self, key: &str) -> KvResult<Vec<String>> {
        Ok(self.read_set(key)?.into_iter().collect())
    }

    fn sismember(&self, key: &str, member: &str) -> KvResult<bool> {
        let now = self.clock.now();
        let slots = self.slots.read();
        match slots.get(key).filter(|s| s.is_live(now)) {
            None => Ok(false),
            Some(Slot {
                data: Data::Set(set),
                ..
            }) => Ok(set.contains(member)),
            Some(_) => Err(KvError::wrong_type(key, "set")),
        }
    }

    fn sunionstore(&self, dest: &str, keys: &[&str]) -> KvResult<usize> {
        self.combine_into(dest, keys, |mut acc, set| {
            acc.extend(set.iter().cloned());
            acc
        })
    }

    fn sinterstore(&self, dest: &str, keys: &[&str]) -> KvResult<usize> {
        self.combine_into(dest, keys, |acc, set| acc.intersection(set).cloned().collect())
    }

    fn sdiffstore(&self, dest: &str, keys: &[&str]) -> KvResult<usize> {
        self.combine_into(dest, keys, |acc, set| acc.difference(set).cloned().collect())
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> KvResult<bool> {
        self.with_live_slot(key, |slots, _| {
            let slot = slots
                .entry(key.to_string())
                .or_insert_with(|| Slot::persistent(Data::Hash(BTreeMap::new())));
            match &mut slot.data {
                Data::Hash(hash) => Ok(hash.insert(field.to_string(), value.to_string()).is_none()),
                _ => Err(KvError::wrong_type(key, "hash")),
            }
        })
    }

    fn hget(&self, key: &str, field: &str) -> KvResult<Option<String>> {
        let now = self.clock.now();
        let slots = self.slots.read();
        match slots.get(key).filter(|s| s.is_live(now)) {
            None => Ok(None),
            Some(Slot {
                data: Data::Hash(hash),
                ..
            }) => Ok(hash.get(field).cloned()),
            Some(_) => Err(KvError::wrong_type(key, "hash")),
        }
    }

    fn hgetall(&self, key: &str) -> KvResult<Vec<(String, String)>> {
        let now = self.clock.now();
        let slots = self.slots.read();
        match slots.get(key).filter(|s| s.is_live(now)) {
            None => Ok(Vec::new()),
            Some(Slot {
                data: Data::Hash(hash),
                ..
            }) => Ok(hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            Some(_) => Err(KvError::wrong_type(key, "hash")),
        }
    }

    fn hdel(&self, key: &str, field: &str) -> KvResult<bool> {
        self.with_live_slot(key, |slots, _| {
            let Some(slot) = slots.get_mut(key) else {
                return Ok(false);
            };
            let (removed, now_empty) = match &mut slot.data {
                Data::Hash(hash) => (hash.remove(field).is_some(), hash.is_empty()),
                _ => return Err(KvError::wrong_type(key, "hash")),
            };
            if now_empty {
                slots.remove(key);
            }
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store_with_clock() -> (InMemoryKvStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at(1_000));
        (InMemoryKvStore::with_clock(clock.clone()), clock)
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryKvStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn memory_set_and_get() {
        let store = InMemoryKvStore::new();
        store.set("k", b"v1", None).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v1".to_vec()));

        store.set("k", b"v2", None).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_ttl_expires_key() {
        let (store, clock) = store_with_clock();
        store.set("k", b"v", Some(Duration::from_secs(10))).unwrap();
        assert_eq!(store.ttl("k").unwrap(), KeyTtl::Expires(Duration::from_secs(10)));

        clock.advance(Duration::from_secs(4));
        assert_eq!(store.ttl("k").unwrap(), KeyTtl::Expires(Duration::from_secs(6)));
        assert!(store.exists("k").unwrap());

        clock.advance(Duration::from_secs(6));
        assert!(!store.exists("k").unwrap());
        assert_eq!(store.get("k").unwrap(), None);
        assert_eq!(store.ttl("k").unwrap(), KeyTtl::Missing);
    }

    #[test]
    fn memory_zero_ttl_is_persistent() {
        let (store, clock) = store_with_clock();
        store.set("k", b"v", Some(Duration::ZERO)).unwrap();
        clock.advance(Duration::from_secs(1_000_000));
        assert_eq!(store.ttl("k").unwrap(), KeyTtl::Persistent);
    }

    #[test]
    fn memory_set_nx_only_once() {
        let store = InMemoryKvStore::new();
        assert!(store.set_nx("gate", b"1", None).unwrap());
        assert!(!store.set_nx("gate", b"2", None).unwrap());
        assert_eq!(store.get("gate").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn memory_set_nx_after_expiry() {
        let (store, clock) = store_with_clock();
        assert!(store.set_nx("gate", b"1", Some(Duration::from_secs(5))).unwrap());
        assert!(!store.set_nx("gate", b"1", Some(Duration::from_secs(5))).unwrap());
        clock.advance(Duration::from_secs(5));
        assert!(store.set_nx("gate", b"1", Some(Duration::from_secs(5))).unwrap());
    }

    #[test]
    fn memory_delete_reports_existence() {
        let store = InMemoryKvStore::new();
        store.set("k", b"v", None).unwrap();
        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
    }

    #[test]
    fn memory_keys_by_pattern() {
        let store = InMemoryKvStore::new();
        store.set("p:{t}:row:1", b"a", None).unwrap();
        store.set("p:{t}:row:2", b"b", None).unwrap();
        store.sadd("p:{t}:index:x:1", "1").unwrap();

        assert_eq!(
            store.keys("p:{t}:row:*").unwrap(),
            vec!["p:{t}:row:1".to_string(), "p:{t}:row:2".to_string()]
        );
        assert_eq!(store.keys("p:{t}:*").unwrap().len(), 3);
    }

    #[test]
    fn memory_keys_skip_expired() {
        let (store, clock) = store_with_clock();
        store.set("a", b"1", Some(Duration::from_secs(1))).unwrap();
        store.set("b", b"1", None).unwrap();
        clock.advance(Duration::from_secs(2));
        assert_eq!(store.keys("*").unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn memory_set_membership() {
        let store = InMemoryKvStore::new();
        assert!(store.sadd("s", "a").unwrap());
        assert!(!store.sadd("s", "a").unwrap());
        assert!(store.sadd("s", "b").unwrap());

        assert!(store.sismember("s", "a").unwrap());
        assert!(!store.sismember("s", "z").unwrap());
        assert_eq!(sorted(store.smembers("s").unwrap()), vec!["a", "b"]);

        assert!(store.srem("s", "a").unwrap());
        assert!(!store.srem("s", "a").unwrap());
    }

    #[test]
    fn memory_empty_set_disappears() {
        let store = InMemoryKvStore::new();
        store.sadd("s", "a").unwrap();
        store.srem("s", "a").unwrap();
        assert!(!store.exists("s").unwrap());
    }

    #[test]
    fn memory_set_algebra() {
        let store = InMemoryKvStore::new();
        for m in ["1", "2", "3"] {
            store.sadd("a", m).unwrap();
        }
        for m in ["2", "3", "4"] {
            store.sadd("b", m).unwrap();
        }

        assert_eq!(store.sunionstore("u", &["a", "b"]).unwrap(), 4);
        assert_eq!(sorted(store.smembers("u").unwrap()), vec!["1", "2", "3", "4"]);

        assert_eq!(store.sinterstore("i", &["a", "b"]).unwrap(), 2);
        assert_eq!(sorted(store.smembers("i").unwrap()), vec!["2", "3"]);

        assert_eq!(store.sdiffstore("d", &["a", "b"]).unwrap(), 1);
        assert_eq!(store.smembers("d").unwrap(), vec!["1"]);
    }

    #[test]
    fn memory_set_store_can_reuse_destination() {
        let store = InMemoryKvStore::new();
        store.sadd("a", "1").unwrap();
        store.sadd("a", "2").unwrap();
        store.sadd("b", "2").unwrap();

        store.sunionstore("tmp", &["a"]).unwrap();
        assert_eq!(store.sdiffstore("tmp", &["tmp", "b"]).unwrap(), 1);
        assert_eq!(store.smembers("tmp").unwrap(), vec!["1"]);
    }

    #[test]
    fn memory_set_store_sees_one_state_of_all_sources() {
        let store = Arc::new(InMemoryKvStore::new());
        store.sadd("a", "m").unwrap();

        // "m" moves back and forth and is always in at least one of the sets
        let mover = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..2_000 {
                    store.sadd("b", "m").unwrap();
                    store.srem("a", "m").unwrap();
                    store.sadd("a", "m").unwrap();
                    store.srem("b", "m").unwrap();
                }
            })
        };
        for _ in 0..2_000 {
            assert_eq!(store.sunionstore("u", &["a", "b"]).unwrap(), 1);
        }
        mover.join().unwrap();
    }

    #[test]
    fn memory_empty_result_deletes_destination() {
        let store = InMemoryKvStore::new();
        store.sadd("a", "1").unwrap();
        store.sadd("b", "2").unwrap();
        store.set("dest", b"old", None).unwrap();

        assert_eq!(store.sinterstore("dest", &["a", "b"]).unwrap(), 0);
        assert!(!store.exists("dest").unwrap());
    }

    #[test]
    fn memory_missing_sources_are_empty() {
        let store = InMemoryKvStore::new();
        store.sadd("a", "1").unwrap();
        assert_eq!(store.sunionstore("u", &["a", "missing"]).unwrap(), 1);
        assert_eq!(store.sinterstore("i", &["a", "missing"]).unwrap(), 0);
    }

    #[test]
    fn memory_wrong_type_is_error() {
        let store = InMemoryKvStore::new();
        store.set("str", b"v", None).unwrap();
        store.sadd("set", "m").unwrap();

        assert!(matches!(store.sadd("str", "m"), Err(KvError::WrongType { .. })));
        assert!(matches!(store.get("set"), Err(KvError::WrongType { .. })));
        assert!(matches!(store.hget("set", "f"), Err(KvError::WrongType { .. })));
    }

    #[test]
    fn memory_set_replaces_any_kind() {
        let store = InMemoryKvStore::new();
        store.sadd("k", "m").unwrap();
        store.set("k", b"v", None).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn memory_hash_fields() {
        let store = InMemoryKvStore::new();
        assert!(store.hset("h", "users", "UserTable").unwrap());
        assert!(!store.hset("h", "users", "UserTable2").unwrap());
        assert!(store.hset("h", "orders", "OrderTable").unwrap());

        assert_eq!(store.hget("h", "users").unwrap(), Some("UserTable2".to_string()));
        assert_eq!(
            store.hgetall("h").unwrap(),
            vec![
                ("orders".to_string(), "OrderTable".to_string()),
                ("users".to_string(), "UserTable2".to_string()),
            ]
        );

        assert!(store.hdel("h", "orders").unwrap());
        assert!(store.hdel("h", "users").unwrap());
        assert!(!store.exists("h").unwrap());
    }

    #[test]
    fn memory_clear() {
        let store = InMemoryKvStore::new();
        store.set("a", b"1", None).unwrap();
        store.sadd("b", "1").unwrap();
        store.clear();
        assert!(store.is_empty());
    }
}
