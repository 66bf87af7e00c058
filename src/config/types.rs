//! Config types for lazyjson.
//!
//! Defines the column layout (field specs), level mapping and ingestion
//! limits, plus the raw structures the YAML file is parsed into.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default wait between tail polls and publisher ticks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Default cap on bytes read from one source (2 GiB).
pub const DEFAULT_MAX_FILE_SIZE: ByteSize = ByteSize(2 * 1024 * 1024 * 1024);

/// Longest accepted column title.
pub const MAX_TITLE_LEN: usize = 32;

/// How the value found for a field is turned into display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Already formatted time, only sanitized.
    Time,
    /// Epoch number whose unit is guessed from its digit count.
    NumericTime,
    /// Epoch seconds.
    SecondTime,
    /// Epoch milliseconds.
    MilliTime,
    /// Epoch microseconds.
    MicroTime,
    Message,
    Level,
    Any,
}

impl FieldKind {
    pub fn is_time(self) -> bool {
        matches!(
            self,
            FieldKind::NumericTime
                | FieldKind::SecondTime
                | FieldKind::MilliTime
                | FieldKind::MicroTime
        )
    }
}

/// One table column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub title: String,
    pub kind: FieldKind,
    /// Candidate path references, tried in order.
    #[serde(rename = "ref")]
    pub references: Vec<String>,
    /// Column width in cells, 0 for a flexible column.
    #[serde(default)]
    pub width: u16,
    /// strftime layout for time kinds, RFC 3339 when absent.
    #[serde(default)]
    pub time_format: Option<String>,
}

impl FieldSpec {
    pub fn new(title: &str, kind: FieldKind, references: &[&str], width: u16) -> Self {
        Self {
            title: title.to_string(),
            kind,
            references: references.iter().map(|r| r.to_string()).collect(),
            width,
            time_format: None,
        }
    }
}

/// Byte count that accepts human sizes such as `512k`, `1.5m` or `2g`.
///
/// Suffixes are binary multiples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl FromStr for ByteSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        let split = text
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(text.len());
        let (number, unit) = text.split_at(split);

        let multiplier: u64 = match unit.trim() {
            "" | "b" => 1,
            "k" | "kb" | "kib" => 1 << 10,
            "m" | "mb" | "mib" => 1 << 20,
            "g" | "gb" | "gib" => 1 << 30,
            "t" | "tb" | "tib" => 1 << 40,
            other => return Err(format!("unknown size unit '{}' in '{}'", other, s)),
        };

        if let Ok(whole) = number.parse::<u64>() {
            return whole
                .checked_mul(multiplier)
                .map(ByteSize)
                .ok_or_else(|| format!("size '{}' is too large", s));
        }

        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid size '{}'", s))?;
        let bytes = value * multiplier as f64;
        if !bytes.is_finite() || bytes < 0.0 || bytes >= u64::MAX as f64 {
            return Err(format!("size '{}' is out of range", s));
        }
        Ok(ByteSize(bytes as u64))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(u64, &str); 4] = [(1 << 40, "t"), (1 << 30, "g"), (1 << 20, "m"), (1 << 10, "k")];
        for (size, suffix) in UNITS {
            if self.0 >= size && self.0 % size == 0 {
                return write!(f, "{}{}", self.0 / size, suffix);
            }
        }
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawByteSize {
            Bytes(u64),
            Text(String),
        }

        match RawByteSize::deserialize(deserializer)? {
            RawByteSize::Bytes(bytes) => Ok(ByteSize(bytes)),
            RawByteSize::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Raw config file structure (used for parsing).
///
/// Every key is optional; missing keys keep their defaults.
/// Unknown fields are rejected with an error.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub fields: Option<Vec<FieldSpec>>,
    /// Extra level aliases, merged over the built-in numeric ones.
    #[serde(default)]
    pub custom_level_mapping: Option<HashMap<String, String>>,
    #[serde(default)]
    pub max_file_size: Option<ByteSize>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub fields: Vec<FieldSpec>,
    /// Normalized (lowercase, trimmed) level value to level name.
    pub custom_level_mapping: HashMap<String, String>,
    pub max_file_size: ByteSize,
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fields: default_fields(),
            custom_level_mapping: default_level_mapping(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Time, Level and Message columns covering the common JSON loggers.
pub fn default_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(
            "Time",
            FieldKind::NumericTime,
            &["$.timestamp", "$.time", "$.t", "$.ts", "$[\"@timestamp\"]"],
            30,
        ),
        FieldSpec::new("Level", FieldKind::Level, &["$.level", "$.lvl", "$.l"], 10),
        FieldSpec::new(
            "Message",
            FieldKind::Message,
            &["$.message", "$.msg", "$.error", "$.err"],
            0,
        ),
    ]
}

/// Numeric levels used by pino and bunyan.
pub fn default_level_mapping() -> HashMap<String, String> {
    [
        ("10", "trace"),
        ("20", "debug"),
        ("30", "info"),
        ("40", "warn"),
        ("50", "error"),
        ("60", "fatal"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
