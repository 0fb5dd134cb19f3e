//! Key-value store trait definition.

use crate::error::KvResult;
use std::time::Duration;

/// Remaining lifetime of a key, as reported by [`KvStore::ttl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist (or has already expired).
    Missing,
    /// The key exists and never expires.
    Persistent,
    /// The key exists and expires after the given duration.
    Expires(Duration),
}

impl KeyTtl {
    /// Returns the remaining lifetime, if the key has one.
    #[must_use]
    pub fn remaining(self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(d) => Some(d),
            KeyTtl::Missing | KeyTtl::Persistent => None,
        }
    }
}

/// A shared key-value store.
///
/// Stores hold byte strings, string sets and string hashes under string
/// keys. Every method is a single atomic operation; callers composing
/// several operations must tolerate interleaving from other processes.
///
/// # Invariants
///
/// - A TTL of `None` or `Some(Duration::ZERO)` means the key never expires
/// - Expired keys are indistinguishable from keys that were never written
/// - Set-store operations treat missing source keys as empty sets, overwrite
///   the destination, and delete it when the result is empty
/// - `set_nx` succeeds for exactly one of several concurrent callers
///
/// # Implementors
///
/// - [`super::InMemoryKvStore`] - For testing
pub trait KvStore: Send + Sync {
    /// Reads a byte-string value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a set or hash.
    fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>>;

    /// Writes a byte-string value, replacing whatever the key held.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> KvResult<()>;

    /// Writes a byte-string value only if the key is absent.
    ///
    /// Returns `true` if this call created the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    fn set_nx(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> KvResult<bool>;

    /// Deletes a key of any kind. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    fn delete(&self, key: &str) -> KvResult<bool>;

    /// Checks whether a key exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    fn exists(&self, key: &str) -> KvResult<bool>;

    /// Reports the remaining lifetime of a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    fn ttl(&self, key: &str) -> KvResult<KeyTtl>;

    /// Lists every live key matching a glob pattern.
    ///
    /// Supported syntax: `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and `\` escapes.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is malformed.
    fn keys(&self, pattern: &str) -> KvResult<Vec<String>>;

    /// Adds a member to a set. Returns `true` if it was not already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a non-set value.
    fn sadd(&self, key: &str, member: &str) -> KvResult<bool>;

    /// Removes a member from a set. Returns `true` if it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a non-set value.
    fn srem(&self, key: &str, member: &str) -> KvResult<bool>;

    /// Lists the members of a set (empty if the key is missing).
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a non-set value.
    fn smembers(&self, key: &str) -> KvResult<Vec<String>>;

    /// Checks set membership.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a non-set value.
    fn sismember(&self, key: &str, member: &str) -> KvResult<bool>;

    /// Stores the union of `keys` into `dest`. Returns the result cardinality.
    ///
    /// # Errors
    ///
    /// Returns an error if any source key holds a non-set value.
    fn sunionstore(&self, dest: &str, keys: &[&str]) -> KvResult<usize>;

    /// Stores the intersection of `keys` into `dest`. Returns the result cardinality.
    ///
    /// # Errors
    ///
    /// Returns an error if any source key holds a non-set value.
    fn sinterstore(&self, dest: &str, keys: &[&str]) -> KvResult<usize>;

    /// Stores the first key minus every other key into `dest`.
    /// Returns the result cardinality.
    ///
    /// # Errors
    ///
    /// Returns an error if any source key holds a non-set value.
    fn sdiffstore(&self, dest: &str, keys: &[&str]) -> KvResult<usize>;

    /// Sets one field of a hash. Returns `true` if the field is new.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a non-hash value.
    fn hset(&self, key: &str, field: &str, value: &str) -> KvResult<bool>;

    /// Reads one field of a hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a non-hash value.
    fn hget(&self, key: &str, field: &str) -> KvResult<Option<String>>;

    /// Reads every field of a hash, ordered by field name.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a non-hash value.
    fn hgetall(&self, key: &str) -> KvResult<Vec<(String, String)>>;

    /// Deletes one field of a hash. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key holds a non-hash value.
    fn hdel(&self, key: &str, field: &str) -> KvResult<bool>;
}
