//! Cache key namespace.
//!
//! Every key a table writes lives under `{prefix}{table}` with the table
//! name wrapped in literal braces, so a clustered store keeps all keys of
//! one table on one shard:
//!
//! | Purpose | Key |
//! |---------|-----|
//! | Row | `{prefix}{{table}}:row:{token}` |
//! | Index entry | `{prefix}{{table}}:index:{name}:{value}` |
//! | Tombstone | `{prefix}{{table}}:deleted:{token}` |
//! | Dump gate | `{prefix}{{table}}:table:timeout` |
//! | Watermark | `{prefix}{{table}}:table:synchronized` |
//! | Registry | `{prefix}tables:list` |
//! | Query scratch | `temp:tblRedis:{nonce}`, `temp:tblRedis:indexop:{nonce}` |

use tblcache_kv::escape_glob;

/// Prefix shared by every scratch key of a composed query.
pub const TEMP_KEY_PREFIX: &str = "temp:tblRedis:";

/// Key builder for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    base: String,
}

impl KeySpace {
    /// Creates the key space of `table` under `prefix`.
    pub fn new(prefix: &str, table: &str) -> Self {
        Self {
            base: format!("{prefix}{{{table}}}"),
        }
    }

    /// Row key of a record.
    pub fn row(&self, token: &str) -> String {
        format!("{}:row:{token}", self.base)
    }

    /// Pattern matching every row key of the table.
    pub fn row_pattern(&self) -> String {
        format!("{}:row:*", escape_glob(&self.base))
    }

    /// Extracts the token from a row key.
    pub fn token_of<'k>(&self, row_key: &'k str) -> Option<&'k str> {
        row_key
            .strip_prefix(self.base.as_str())
            .and_then(|rest| rest.strip_prefix(":row:"))
    }

    /// Index entry key.
    pub fn index(&self, name: &str, value: &str) -> String {
        format!("{}:index:{name}:{value}", self.base)
    }

    /// Pattern matching every entry of one index.
    pub fn index_pattern(&self, name: &str) -> String {
        format!("{}:index:{}:*", escape_glob(&self.base), escape_glob(name))
    }

    /// Extracts the index value from an index entry key.
    pub fn index_value_of<'k>(&self, name: &str, index_key: &'k str) -> Option<&'k str> {
        index_key
            .strip_prefix(self.base.as_str())
            .and_then(|rest| rest.strip_prefix(":index:"))
            .and_then(|rest| rest.strip_prefix(name))
            .and_then(|rest| rest.strip_prefix(':'))
    }

    /// Tombstone key of a record.
    pub fn deleted(&self, token: &str) -> String {
        format!("{}:deleted:{token}", self.base)
    }

    /// Dump gate key.
    pub fn timeout(&self) -> String {
        format!("{}:table:timeout", self.base)
    }

    /// Synchronization watermark key.
    pub fn synchronized(&self) -> String {
        format!("{}:table:synchronized", self.base)
    }
}

/// Key of the process-wide table registry.
pub fn tables_list_key(prefix: &str) -> String {
    format!("{prefix}tables:list")
}

/// Allocation marker of a composed query.
pub fn temp_marker_key(nonce: &str) -> String {
    format!("{TEMP_KEY_PREFIX}{nonce}")
}

/// Result set key of a composed query.
pub fn temp_result_key(nonce: &str) -> String {
    format!("{TEMP_KEY_PREFIX}indexop:{nonce}")
}
