//! Index query composition.
//!
//! A query names one or more `(index, value)` pairs. The first pair seeds
//! the result; each later pair is folded in with a set operation, left to
//! right, inside scratch keys of the key-value store.

use crate::error::{CoreError, CoreResult};
use crate::keys::{temp_marker_key, temp_result_key};
use crate::record::CachedRecord;
use crate::store::RecordStore;
use crate::tombstone::Tombstones;
use std::fmt;
use std::str::FromStr;
use tblcache_kv::KvStore;
use tracing::{trace, warn};
use uuid::Uuid;

/// How an index use combines with the result so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexOp {
    /// Seeds the result. Only the first use may be primary.
    Primary,
    /// Keeps members found in either side.
    Union,
    /// Keeps members found in both sides.
    Intersect,
    /// Keeps members of the result that are not in this index.
    Diff,
}

impl IndexOp {
    /// The operation's name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Union => "union",
            Self::Intersect => "intersect",
            Self::Diff => "diff",
        }
    }
}

impl fmt::Display for IndexOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexOp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Self::Primary),
            "union" => Ok(Self::Union),
            "intersect" => Ok(Self::Intersect),
            "diff" => Ok(Self::Diff),
            other => Err(CoreError::UnknownOperation {
                operation: other.to_string(),
            }),
        }
    }
}

/// One `(index, value, operation)` step of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexUse {
    /// Index name.
    pub index: String,
    /// Index value to look up.
    pub value: String,
    /// How this step combines with the result so far.
    pub op: IndexOp,
}

/// An ordered list of index uses.
///
/// # Example
///
/// ```rust
/// use tblcache_core::{IndexOp, IndexQuery};
///
/// let query = IndexQuery::new("status", "open")
///     .union("status", "pending")
///     .diff("owner", "7");
/// assert_eq!(query.uses().len(), 3);
/// assert_eq!(query.uses()[0].op, IndexOp::Primary);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexQuery {
    uses: Vec<IndexUse>,
}

impl IndexQuery {
    /// Starts a query seeded by one index entry.
    pub fn new(index: impl Into<String>, value: impl Into<String>) -> Self {
        Self::default().using(index, value, IndexOp::Primary)
    }

    /// Appends a use with an explicit operation.
    ///
    /// The first use of a query is always treated as primary.
    #[must_use]
    pub fn using(mut self, index: impl Into<String>, value: impl Into<String>, op: IndexOp) -> Self {
        self.uses.push(IndexUse {
            index: index.into(),
            value: value.into(),
            op,
        });
        self
    }

    /// Appends a use whose operation is given by name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownOperation`] for an unrecognized name.
    pub fn using_named(
        self,
        index: impl Into<String>,
        value: impl Into<String>,
        op: &str,
    ) -> CoreResult<Self> {
        Ok(self.using(index, value, op.parse()?))
    }

    /// Appends a union step.
    #[must_use]
    pub fn union(self, index: impl Into<String>, value: impl Into<String>) -> Self {
        self.using(index, value, IndexOp::Union)
    }

    /// Appends an intersection step.
    #[must_use]
    pub fn intersect(self, index: impl Into<String>, value: impl Into<String>) -> Self {
        self.using(index, value, IndexOp::Intersect)
    }

    /// Appends a difference step.
    #[must_use]
    pub fn diff(self, index: impl Into<String>, value: impl Into<String>) -> Self {
        self.using(index, value, IndexOp::Diff)
    }

    /// The uses, in order.
    pub fn uses(&self) -> &[IndexUse] {
        &self.uses
    }

    /// Checks the query against a table's indexes.
    fn validate(&self, store: &RecordStore) -> CoreResult<()> {
        if self.uses.is_empty() {
            return Err(CoreError::EmptyQuery);
        }
        for (i, step) in self.uses.iter().enumerate() {
            store.index().require(&step.index)?;
            if i > 0 && step.op == IndexOp::Primary {
                return Err(CoreError::DuplicatePrimary {
                    table: store.index().table().table_name().to_string(),
                    index: step.index.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Scratch keys of one composed query, deleted on drop.
struct ScratchKeys<'a> {
    kv: &'a dyn KvStore,
    marker: String,
    result: String,
}

impl<'a> ScratchKeys<'a> {
    /// Claims a fresh marker, retrying on collision.
    fn allocate(kv: &'a dyn KvStore) -> CoreResult<Self> {
        loop {
            let nonce = Uuid::new_v4().simple().to_string();
            let marker = temp_marker_key(&nonce);
            if kv.set_nx(&marker, b"1", None)? {
                return Ok(Self {
                    kv,
                    marker,
                    result: temp_result_key(&nonce),
                });
            }
            trace!(key = %marker, "temp key collision, retrying");
        }
    }
}

impl Drop for ScratchKeys<'_> {
    fn drop(&mut self) {
        for key in [&self.result, &self.marker] {
            if let Err(e) = self.kv.delete(key) {
                warn!(key = %key, error = %e, "failed to delete temp key");
            }
        }
    }
}

/// Runs a query and returns the matching records lazily.
pub(crate) fn compose<'a>(
    store: &'a RecordStore,
    tombstones: &'a Tombstones,
    query: &IndexQuery,
) -> CoreResult<RecordStream<'a>> {
    query.validate(store)?;

    let keys = store.index().keys();
    let (first, rest) = query.uses.split_first().ok_or(CoreError::EmptyQuery)?;
    let seed = keys.index(&first.index, &first.value);

    if rest.is_empty() {
        let tokens = store.index().kv().smembers(&seed)?;
        return Ok(RecordStream::new(store, tombstones, tokens, Some(seed)));
    }

    let kv = store.index().kv().as_ref();
    let scratch = ScratchKeys::allocate(kv)?;
    let mut count = kv.sunionstore(&scratch.result, &[seed.as_str()])?;
    for step in rest {
        let other = keys.index(&step.index, &step.value);
        let sources = [scratch.result.as_str(), other.as_str()];
        count = match step.op {
            IndexOp::Union => kv.sunionstore(&scratch.result, &sources)?,
            IndexOp::Intersect => kv.sinterstore(&scratch.result, &sources)?,
            IndexOp::Diff => kv.sdiffstore(&scratch.result, &sources)?,
            IndexOp::Primary => {
                return Err(CoreError::DuplicatePrimary {
                    table: store.index().table().table_name().to_string(),
                    index: step.index.clone(),
                })
            }
        };
    }

    let tokens = if count > 0 {
        kv.smembers(&scratch.result)?
    } else {
        Vec::new()
    };
    drop(scratch);

    Ok(RecordStream::new(store, tombstones, tokens, None))
}

/// Records matching a query, loaded one at a time.
///
/// Tokens whose row is gone are skipped; for single-index queries they are
/// also removed from the index entry. Rows under a tombstone are skipped.
pub struct RecordStream<'a> {
    store: &'a RecordStore,
    tombstones: &'a Tombstones,
    tokens: std::vec::IntoIter<String>,
    prune_from: Option<String>,
}

impl<'a> RecordStream<'a> {
    pub(crate) fn new(
        store: &'a RecordStore,
        tombstones: &'a Tombstones,
        tokens: Vec<String>,
        prune_from: Option<String>,
    ) -> Self {
        Self {
            store,
            tombstones,
            tokens: tokens.into_iter(),
            prune_from,
        }
    }

    /// Number of tokens not yet resolved.
    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }

    fn resolve(&self, token: &str) -> CoreResult<Option<CachedRecord>> {
        if self.tombstones.is_deleted(token)? {
            return Ok(None);
        }
        let loaded = self.store.load(token)?;
        if loaded.is_none() {
            if let Some(key) = &self.prune_from {
                self.store.index().prune(key, token)?;
            }
        }
        Ok(loaded)
    }
}

impl Iterator for RecordStream<'_> {
    type Item = CoreResult<CachedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let token = self.tokens.next()?;
            match self.resolve(&token) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.tokens.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_names_roundtrip() {
        for op in [IndexOp::Primary, IndexOp::Union, IndexOp::Intersect, IndexOp::Diff] {
            assert_eq!(op.as_str().parse::<IndexOp>().unwrap(), op);
        }
    }

    #[test]
    fn unknown_op_is_configuration_error() {
        let err = "xor".parse::<IndexOp>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownOperation { ref operation } if operation == "xor"));
        assert!(err.is_configuration());

        assert!(IndexQuery::new("a", "1").using_named("b", "2", "xor").is_err());
    }

    #[test]
    fn builder_keeps_order() {
        let query = IndexQuery::new("a", "1")
            .intersect("b", "2")
            .union("a", "3")
            .using_named("c", "4", "diff")
            .unwrap();
        let ops: Vec<_> = query.uses().iter().map(|u| u.op).collect();
        assert_eq!(
            ops,
            vec![IndexOp::Primary, IndexOp::Intersect, IndexOp::Union, IndexOp::Diff]
        );
        assert_eq!(query.uses()[2].value, "3");
    }
}
