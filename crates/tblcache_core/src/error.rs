//! Error types for the table cache.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in table cache operations.
///
/// "Not found" is never an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Key-value store error.
    #[error("key-value error: {0}")]
    Kv(#[from] tblcache_kv::KvError),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] tblcache_codec::CodecError),

    /// Durable store error.
    #[error("durable store error: {0}")]
    Durable(#[from] crate::durable::DurableError),

    /// A query or lookup named an index the table does not define.
    #[error("table {table} has no index named {index}")]
    UndefinedIndex {
        /// Table name.
        table: String,
        /// Index name as requested.
        index: String,
    },

    /// A query marked more than one index use as primary.
    #[error("index {index} on table {table} marked primary, but a query has exactly one primary index")]
    DuplicatePrimary {
        /// Table name.
        table: String,
        /// The second index marked primary.
        index: String,
    },

    /// An index operation name was not recognized.
    #[error("unknown index operation: {operation}")]
    UnknownOperation {
        /// The operation as supplied.
        operation: String,
    },

    /// A query used no indexes at all.
    #[error("index query is empty")]
    EmptyQuery,

    /// A record lacks one of its table's primary key fields.
    #[error("record for table {table} has no primary key field {field}")]
    MissingPrimaryKey {
        /// Table name.
        table: String,
        /// Missing field.
        field: String,
    },

    /// A cache entry could not be interpreted.
    #[error("corrupt cache entry at {key}: {message}")]
    CorruptEntry {
        /// Key of the entry.
        key: String,
        /// Description of the problem.
        message: String,
    },

    /// No table is registered under this name.
    #[error("unknown table: {table}")]
    UnknownTable {
        /// Table name.
        table: String,
    },
}

impl CoreError {
    /// Creates a corrupt entry error.
    pub fn corrupt_entry(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CorruptEntry {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates an undefined index error.
    pub fn undefined_index(table: impl Into<String>, index: impl Into<String>) -> Self {
        Self::UndefinedIndex {
            table: table.into(),
            index: index.into(),
        }
    }

    /// Returns true for caller mistakes that retrying cannot fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UndefinedIndex { .. }
                | Self::DuplicatePrimary { .. }
                | Self::UnknownOperation { .. }
                | Self::EmptyQuery
                | Self::MissingPrimaryKey { .. }
                | Self::UnknownTable { .. }
        )
    }
}
