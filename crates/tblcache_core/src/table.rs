//! Per-table capabilities.

use crate::config::TableConfig;
use crate::index::{IndexDefinition, IndexDefinitions};
use crate::record::Record;
use std::time::Duration;

/// What the cache needs to know about one table.
///
/// Implement this on a table-specific type to customize indexes, TTLs and
/// dump behavior; [`TableDef`] covers the common case.
pub trait CachedTable: Send + Sync {
    /// Table name, used in every key of the table.
    fn table_name(&self) -> &str;

    /// Primary key field names, in key order.
    fn primary_key(&self) -> &[String];

    /// Secondary index definitions.
    fn index_definitions(&self) -> &IndexDefinitions;

    /// Base configuration.
    fn config(&self) -> &TableConfig;

    /// Lifetime of a cached row.
    fn row_ttl(&self) -> Duration {
        self.config().row_ttl
    }

    /// Minimum time between dump passes; zero disables dumping.
    fn dump_interval(&self) -> Duration {
        self.config().dump_interval
    }

    /// Number of dump intervals a row must be expected to survive.
    fn staleness_scale(&self) -> f64 {
        self.config().staleness_scale
    }

    /// Delimiter for tokens and index values.
    fn field_delimiter(&self) -> &str {
        &self.config().field_delimiter
    }

    /// Whether a dump pass may run right now.
    fn ready_for_dump(&self) -> bool {
        true
    }

    /// Name recorded for this table in the registry.
    fn type_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A table described entirely by data.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tblcache_core::{CachedTable, TableConfig, TableDef};
///
/// let users = TableDef::new("users", ["id"])
///     .index_fields("email", ["email"])
///     .with_config(TableConfig::new().row_ttl(Duration::from_secs(3600)));
///
/// assert_eq!(users.table_name(), "users");
/// assert_eq!(users.row_ttl(), Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct TableDef {
    name: String,
    primary_key: Vec<String>,
    indexes: IndexDefinitions,
    config: TableConfig,
    type_name: Option<String>,
}

impl TableDef {
    /// Creates a table with the given primary key fields.
    pub fn new<S: Into<String>>(name: impl Into<String>, primary_key: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            indexes: IndexDefinitions::new(),
            config: TableConfig::default(),
            type_name: None,
        }
    }

    /// Adds a field-list index.
    #[must_use]
    pub fn index_fields<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.indexes.insert(name, IndexDefinition::fields(fields));
        self
    }

    /// Adds a computed index.
    #[must_use]
    pub fn index_computed(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Record) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.indexes.insert(name, IndexDefinition::computed(f));
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the name recorded in the registry.
    #[must_use]
    pub fn registered_as(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

impl CachedTable for TableDef {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    fn index_definitions(&self) -> &IndexDefinitions {
        &self.indexes
    }

    fn config(&self) -> &TableConfig {
        &self.config
    }

    fn type_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or("TableDef")
    }
}
