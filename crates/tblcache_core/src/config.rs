//! Per-table cache configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default key prefix for every cache key.
pub const DEFAULT_KEY_PREFIX: &str = "tblRedis:";

/// Default delimiter joining primary key and index field values.
pub const DEFAULT_FIELD_DELIMITER: &str = "_";

/// Configuration for one cached table.
///
/// Loaded from any serde format; missing fields take their defaults.
/// Durations are written as whole seconds, except the per-row dump
/// pause which is written in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Lifetime of a cached row (0 = never expires).
    #[serde(with = "secs")]
    pub row_ttl: Duration,

    /// Minimum time between dump passes (0 = dumping disabled).
    #[serde(with = "secs")]
    pub dump_interval: Duration,

    /// How many dump intervals a row must be expected to survive. May be
    /// fractional.
    pub staleness_scale: f64,

    /// Delimiter joining field values in tokens and index values.
    pub field_delimiter: String,

    /// Prefix of every key this table writes.
    pub key_prefix: String,

    /// Pause after each row of a dump pass.
    #[serde(with = "micros")]
    pub dump_row_pause: Duration,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_ttl: Duration::ZERO,
            dump_interval: Duration::ZERO,
            staleness_scale: 2.0,
            field_delimiter: DEFAULT_FIELD_DELIMITER.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            dump_row_pause: Duration::from_micros(1500),
        }
    }
}

impl TableConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the row lifetime.
    #[must_use]
    pub const fn row_ttl(mut self, ttl: Duration) -> Self {
        self.row_ttl = ttl;
        self
    }

    /// Sets the dump interval.
    #[must_use]
    pub const fn dump_interval(mut self, interval: Duration) -> Self {
        self.dump_interval = interval;
        self
    }

    /// Sets the staleness scale factor.
    #[must_use]
    pub const fn staleness_scale(mut self, scale: f64) -> Self {
        self.staleness_scale = scale;
        self
    }

    /// Sets the pause after each dumped row.
    #[must_use]
    pub const fn dump_row_pause(mut self, pause: Duration) -> Self {
        self.dump_row_pause = pause;
        self
    }

    /// Sets the field delimiter.
    #[must_use]
    pub fn field_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.field_delimiter = delimiter.into();
        self
    }

    /// Sets the key prefix.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Returns true if dump passes are enabled.
    pub fn dumping_enabled(&self) -> bool {
        !self.dump_interval.is_zero()
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod micros {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_micros()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TableConfig::default();
        assert_eq!(config.row_ttl, Duration::ZERO);
        assert_eq!(config.dump_interval, Duration::ZERO);
        assert_eq!(config.staleness_scale, 2.0);
        assert_eq!(config.field_delimiter, "_");
        assert_eq!(config.key_prefix, "tblRedis:");
        assert_eq!(config.dump_row_pause, Duration::from_micros(1500));
        assert!(!config.dumping_enabled());
    }

    #[test]
    fn builder_pattern() {
        let config = TableConfig::new()
            .row_ttl(Duration::from_secs(60))
            .dump_interval(Duration::from_secs(10))
            .staleness_scale(1.5)
            .field_delimiter("|")
            .key_prefix("app:");

        assert_eq!(config.row_ttl, Duration::from_secs(60));
        assert!(config.dumping_enabled());
        assert_eq!(config.staleness_scale, 1.5);
        assert_eq!(config.field_delimiter, "|");
        assert_eq!(config.key_prefix, "app:");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: TableConfig =
            serde_json::from_str(r#"{"row_ttl": 300, "dump_interval": 60}"#).unwrap();
        assert_eq!(config.row_ttl, Duration::from_secs(300));
        assert_eq!(config.dump_interval, Duration::from_secs(60));
        assert_eq!(config.staleness_scale, 2.0);
        assert_eq!(config.key_prefix, "tblRedis:");
    }

    #[test]
    fn json_units() {
        let config = TableConfig::new()
            .row_ttl(Duration::from_secs(5))
            .dump_row_pause(Duration::from_micros(250));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["row_ttl"], 5);
        assert_eq!(json["dump_row_pause"], 250);

        let back: TableConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn staleness_scale_accepts_integers_and_fractions() {
        let config: TableConfig = serde_json::from_str(r#"{"staleness_scale": 3}"#).unwrap();
        assert_eq!(config.staleness_scale, 3.0);
        let config: TableConfig = serde_json::from_str(r#"{"staleness_scale": 1.5}"#).unwrap();
        assert_eq!(config.staleness_scale, 1.5);
    }
}
