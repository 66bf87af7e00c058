//! Entry parser: turns one raw log line into the configured columns.

pub mod field;
pub mod format;
pub mod level;

use crate::config::types::{Config, FieldKind, FieldSpec};
use field::{extract_first, FieldPath};
use format::{format_field, PLACEHOLDER};
use log::warn;
use serde_json::Value;
use std::collections::HashMap;

/// One rendered row. Derived on demand and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    /// One formatted string per configured field, in order
    pub fields: Vec<String>,
    /// The line without its terminator
    pub raw: String,
    /// Set when the line could not be re-read
    pub error: Option<String>,
}

impl ParsedEntry {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

struct Column {
    spec: FieldSpec,
    paths: Vec<FieldPath>,
}

/// Field specs with their references compiled once.
pub struct EntryParser {
    columns: Vec<Column>,
    level_mapping: HashMap<String, String>,
}

impl EntryParser {
    pub fn new(config: &Config) -> Self {
        let columns = config
            .fields
            .iter()
            .map(|spec| {
                let paths = spec
                    .references
                    .iter()
                    .filter_map(|reference| match FieldPath::parse(reference) {
                        Ok(path) => Some(path),
                        Err(e) => {
                            warn!("Skipping reference of field '{}': {}", spec.title, e);
                            None
                        }
                    })
                    .collect();
                Column {
                    spec: spec.clone(),
                    paths,
                }
            })
            .collect();

        Self {
            columns,
            level_mapping: config.custom_level_mapping.clone(),
        }
    }

    pub fn specs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.columns.iter().map(|c| &c.spec)
    }

    /// Parse a raw line into formatted fields.
    ///
    /// Lines that are not JSON objects become plain records: the message
    /// columns receive the whole line and every other column the placeholder.
    pub fn parse(&self, line: &[u8]) -> ParsedEntry {
        let raw = String::from_utf8_lossy(line).trim().to_string();

        let fields = match serde_json::from_str::<Value>(&raw) {
            Ok(value) if value.is_object() => self
                .columns
                .iter()
                .map(|column| match extract_first(&value, &column.paths) {
                    Some(text) => format_field(&text, &column.spec, &self.level_mapping),
                    None => PLACEHOLDER.to_string(),
                })
                .collect(),
            _ => self.plain_fields(&format::sanitize(&raw)),
        };

        ParsedEntry {
            fields,
            raw,
            error: None,
        }
    }

    /// Row standing in for a line that could not be re-read
    pub fn failed(&self, message: String) -> ParsedEntry {
        ParsedEntry {
            fields: self.plain_fields(&format::sanitize(&message)),
            raw: String::new(),
            error: Some(message),
        }
    }

    fn plain_fields(&self, text: &str) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| match column.spec.kind {
                FieldKind::Message => text.to_string(),
                _ => PLACEHOLDER.to_string(),
            })
            .collect()
    }
}
