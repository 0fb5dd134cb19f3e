//! Core type definitions.

use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;
use std::fmt;
use tblcache_codec::Value;

/// Rendering of `false` inside tokens and index values.
pub const FALSE_SENTINEL: &str = "@FALSE@";
/// Rendering of `true` inside tokens and index values.
pub const TRUE_SENTINEL: &str = "@TRUE@";
/// Rendering of `null` inside tokens and index values.
pub const NULL_SENTINEL: &str = "@NULL@";

/// Renders one attribute value as it appears inside keys.
///
/// Booleans and null become fixed sentinels so that none of them can be
/// confused with an empty string or with each other.
///
/// ```rust
/// use tblcache_codec::Value;
/// use tblcache_core::render_value;
///
/// assert_eq!(render_value(&Value::Null), "@NULL@");
/// assert_eq!(render_value(&Value::Bool(false)), "@FALSE@");
/// assert_eq!(render_value(&Value::Integer(12)), "12");
/// assert_eq!(render_value(&Value::from("")), "");
/// ```
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => NULL_SENTINEL.to_string(),
        Value::Bool(false) => FALSE_SENTINEL.to_string(),
        Value::Bool(true) => TRUE_SENTINEL.to_string(),
        other => other.to_string(),
    }
}

/// Marks the next character of a joined part as literal.
pub const ESCAPE_CHAR: char = '\\';

/// Joins already-rendered parts with the delimiter.
///
/// Inside each part, the escape character and every character of the
/// delimiter are prefixed with [`ESCAPE_CHAR`], so a delimiter in the
/// output always separates parts and distinct part lists never join to
/// the same string. The delimiter itself must not contain the escape
/// character.
///
/// ```rust
/// use tblcache_core::join_rendered;
///
/// assert_eq!(join_rendered(["x_y", "z"], "_"), "x\\_y_z");
/// assert_eq!(join_rendered(["x", "y_z"], "_"), "x_y\\_z");
/// ```
pub fn join_rendered<'a>(parts: impl IntoIterator<Item = &'a str>, delimiter: &str) -> String {
    let mut out = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push_str(delimiter);
        }
        for c in part.chars() {
            if c == ESCAPE_CHAR || delimiter.contains(c) {
                out.push(ESCAPE_CHAR);
            }
            out.push(c);
        }
    }
    out
}

/// Renders values and joins them with the delimiter.
///
/// This is how both primary key tokens and field-list index values
/// are built, so a caller can compute the value to query for.
pub fn join_values<'a>(values: impl IntoIterator<Item = &'a Value>, delimiter: &str) -> String {
    let rendered: Vec<String> = values.into_iter().map(render_value).collect();
    join_rendered(rendered.iter().map(String::as_str), delimiter)
}

/// A primary key: ordered field names with their rendered values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimaryKey {
    fields: Vec<(String, String)>,
}

impl PrimaryKey {
    /// Creates a single-field key.
    pub fn single(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            fields: vec![(field.into(), render_value(&value.into()))],
        }
    }

    /// Creates a key from field/value pairs, in key order.
    pub fn from_pairs<F, V>(pairs: impl IntoIterator<Item = (F, V)>) -> Self
    where
        F: Into<String>,
        V: Into<Value>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(f, v)| (f.into(), render_value(&v.into())))
                .collect(),
        }
    }

    /// Derives the key of a record from its current attributes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingPrimaryKey`] if an attribute is absent.
    pub fn from_attributes(
        table: &str,
        key_fields: &[String],
        attributes: &BTreeMap<String, Value>,
    ) -> CoreResult<Self> {
        let fields = key_fields
            .iter()
            .map(|field| {
                attributes
                    .get(field)
                    .map(|v| (field.clone(), render_value(v)))
                    .ok_or_else(|| CoreError::MissingPrimaryKey {
                        table: table.to_string(),
                        field: field.clone(),
                    })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { fields })
    }

    /// Returns the delimited token used in keys and index sets.
    ///
    /// ```rust
    /// use tblcache_core::PrimaryKey;
    ///
    /// let pk = PrimaryKey::from_pairs([("uid", 7), ("dt", 20240101)]);
    /// assert_eq!(pk.token("_"), "7_20240101");
    /// ```
    pub fn token(&self, delimiter: &str) -> String {
        join_rendered(self.fields.iter().map(|(_, v)| v.as_str()), delimiter)
    }

    /// Returns the ordered field/value pairs.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Returns the rendered value of one key field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the number of key fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true for a key with no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}={value}")?;
        }
        Ok(())
    }
}

/// Index values a record was last written with, by index name.
///
/// Indexes whose computed value was absent have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSnapshot {
    values: BTreeMap<String, String>,
}

impl IndexSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value recorded for an index.
    pub fn get(&self, index: &str) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Records the value for an index.
    pub fn insert(&mut self, index: impl Into<String>, value: impl Into<String>) {
        self.values.insert(index.into(), value.into());
    }

    /// Iterates over `(index, value)` pairs in index-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of indexes with a value.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no index has a value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IndexSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_distinct() {
        let rendered = [
            render_value(&Value::Null),
            render_value(&Value::Bool(false)),
            render_value(&Value::Bool(true)),
            render_value(&Value::from("")),
        ];
        for (i, a) in rendered.iter().enumerate() {
            for b in &rendered[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn floats_render_without_trailing_zero() {
        assert_eq!(render_value(&Value::Float(1.0)), "1");
        assert_eq!(render_value(&Value::Float(0.25)), "0.25");
    }

    #[test]
    fn join_uses_sentinels() {
        let values = [Value::Integer(3), Value::Null, Value::Bool(true)];
        assert_eq!(join_values(&values, "_"), "3_@NULL@_@TRUE@");
    }

    #[test]
    fn composite_token() {
        let pk = PrimaryKey::from_pairs([("uid", Value::Integer(5)), ("dt", Value::from("2024-01-01"))]);
        assert_eq!(pk.token("_"), "5_2024-01-01");
        assert_eq!(pk.token(":"), "5:2024-01-01");
        assert_eq!(pk.get("dt"), Some("2024-01-01"));
        assert_eq!(pk.len(), 2);
        assert_eq!(pk.to_string(), "uid=5, dt=2024-01-01");
    }

    #[test]
    fn delimiter_inside_values_is_escaped() {
        let left = PrimaryKey::from_pairs([("a", "x_y"), ("b", "z")]);
        let right = PrimaryKey::from_pairs([("a", "x"), ("b", "y_z")]);
        assert_ne!(left.token("_"), right.token("_"));
        assert_eq!(left.token("_"), r"x\_y_z");
        assert_eq!(right.token("_"), r"x_y\_z");

        let left = [Value::from("x_y"), Value::from("z")];
        let right = [Value::from("x"), Value::from("y_z")];
        assert_ne!(join_values(&left, "_"), join_values(&right, "_"));
        assert_eq!(join_values(&left, "_"), r"x\_y_z");
    }

    #[test]
    fn escape_char_is_escaped_too() {
        // Without doubling, ("x\\", "y") and ("x_y") would meet at "x\\_y"
        let trailing_escape = join_rendered([r"x\", "y"], "_");
        let single = join_rendered(["x_y"], "_");
        assert_eq!(trailing_escape, r"x\\_y");
        assert_eq!(single, r"x\_y");
        assert_ne!(trailing_escape, single);
    }

    #[test]
    fn multi_char_delimiters_escape_each_char() {
        assert_eq!(join_rendered(["a::", "b"], "::"), r"a\:\:::b");
        assert_ne!(
            join_rendered(["a::", "b"], "::"),
            join_rendered(["a", ":b"], "::")
        );
    }

    #[test]
    fn sentinels_and_plain_values_are_untouched() {
        let values = [Value::Null, Value::Bool(false), Value::Integer(-3), Value::from("2024-01-01")];
        assert_eq!(join_values(&values, "_"), "@NULL@_@FALSE@_-3_2024-01-01");
    }

    #[test]
    fn key_from_attributes() {
        let mut attrs = BTreeMap::new();
        attrs.insert("id".to_string(), Value::Integer(9));
        attrs.insert("name".to_string(), Value::from("x"));

        let pk = PrimaryKey::from_attributes("users", &["id".to_string()], &attrs).unwrap();
        assert_eq!(pk, PrimaryKey::single("id", 9));

        let err = PrimaryKey::from_attributes("users", &["uid".to_string()], &attrs).unwrap_err();
        assert!(matches!(err, CoreError::MissingPrimaryKey { ref field, .. } if field == "uid"));
    }

    #[test]
    fn snapshot_collects() {
        let snapshot: IndexSnapshot = [("email", "a@x"), ("status", "1")].into_iter().collect();
        assert_eq!(snapshot.get("email"), Some("a@x"));
        assert_eq!(snapshot.get("missing"), None);
        assert_eq!(snapshot.iter().count(), 2);
    }
}
