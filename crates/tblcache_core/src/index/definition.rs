//! Index definitions and the values they resolve to.

use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::types::{join_values, IndexSnapshot};
use std::fmt;
use std::sync::Arc;
use tblcache_codec::Value;

/// A computed index function. `None` keeps the record out of the index.
pub type IndexFn = Arc<dyn Fn(&Record) -> Option<String> + Send + Sync>;

/// How one index derives its value from a record.
#[derive(Clone)]
pub enum IndexDefinition {
    /// Concatenation of field values, in order. Absent fields count as null.
    Fields(Vec<String>),
    /// Arbitrary function of the record.
    Computed(IndexFn),
}

impl IndexDefinition {
    /// Creates a field-list definition.
    pub fn fields<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self::Fields(fields.into_iter().map(Into::into).collect())
    }

    /// Creates a computed definition.
    pub fn computed(f: impl Fn(&Record) -> Option<String> + Send + Sync + 'static) -> Self {
        Self::Computed(Arc::new(f))
    }

    /// Computes this index's value for a record.
    pub fn value_for(&self, record: &Record, delimiter: &str) -> Option<String> {
        match self {
            Self::Fields(fields) => Some(join_values(
                fields
                    .iter()
                    .map(|f| record.get(f).unwrap_or(&Value::Null)),
                delimiter,
            )),
            Self::Computed(f) => f(record),
        }
    }
}

impl fmt::Debug for IndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields(fields) => f.debug_tuple("Fields").field(fields).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// A table's named index definitions, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct IndexDefinitions {
    entries: Vec<(String, IndexDefinition)>,
}

impl IndexDefinitions {
    /// Creates an empty set of definitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a definition.
    pub fn insert(&mut self, name: impl Into<String>, definition: IndexDefinition) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = definition,
            None => self.entries.push((name, definition)),
        }
    }

    /// Builder-style field-list definition.
    #[must_use]
    pub fn with_fields<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.insert(name, IndexDefinition::fields(fields));
        self
    }

    /// Builder-style computed definition.
    #[must_use]
    pub fn with_computed(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Record) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.insert(name, IndexDefinition::computed(f));
        self
    }

    /// Returns a definition by name.
    pub fn get(&self, name: &str) -> Option<&IndexDefinition> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }

    /// Returns a definition by name, or an error naming the table.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UndefinedIndex`] if no such index exists.
    pub fn require(&self, table: &str, name: &str) -> CoreResult<&IndexDefinition> {
        self.get(name)
            .ok_or_else(|| CoreError::undefined_index(table, name))
    }

    /// Iterates over `(name, definition)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexDefinition)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Returns the index names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Returns the number of definitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no indexes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Computes every index value of a record.
    pub fn resolve(&self, record: &Record, delimiter: &str) -> IndexSnapshot {
        self.entries
            .iter()
            .filter_map(|(name, def)| def.value_for(record, delimiter).map(|v| (name.as_str(), v)))
            .collect()
    }
}
