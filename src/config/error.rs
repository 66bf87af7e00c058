//! Config error types for lazyjson.
//!
//! Provides rich error messages with file locations and typo suggestions.

use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;
use strsim::jaro_winkler;

/// Minimum similarity for a known name to be offered as a suggestion.
const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Error loading or parsing a config file.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading the config file.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML parse error.
    Parse {
        path: PathBuf,
        message: String,
        line: Option<usize>,
        column: Option<usize>,
        suggestion: Option<String>,
    },

    /// Validation error (semantic errors after parsing).
    Validation { path: PathBuf, message: String },
}

impl ConfigError {
    /// Build a parse error from a deserializer message.
    ///
    /// Picks up the location when the message carries one, and for unknown
    /// keys or kinds suggests the closest expected name.
    pub fn from_parse_message(path: PathBuf, message: String) -> Self {
        let (line, column) = location_of(&message);
        let suggestion = suggestion_for(&message);
        ConfigError::Parse {
            path,
            message,
            line,
            column,
            suggestion,
        }
    }

    pub fn validation(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Format error in Cargo-style format.
    pub fn format_cargo_style(&self) -> String {
        match self {
            ConfigError::Io { path, source } => {
                format!(
                    "error: cannot read config file\n  --> {}\n  |\n  = {}\n",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse {
                path,
                message,
                line,
                column,
                suggestion,
            } => {
                let location = match (line, column) {
                    (Some(l), Some(c)) => format!("{}:{}:{}", path.display(), l, c),
                    (Some(l), None) => format!("{}:{}", path.display(), l),
                    _ => format!("{}", path.display()),
                };
                let mut output = format!("error: {}\n  --> {}\n  |\n", message, location);
                if let Some(suggestion) = suggestion {
                    output.push_str(&format!("  = help: did you mean `{}`?\n", suggestion));
                }
                output
            }
            ConfigError::Validation { path, message } => {
                format!("error: {}\n  --> {}\n  |\n", message, path.display())
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_cargo_style())
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn location_of(message: &str) -> (Option<usize>, Option<usize>) {
    static LOCATION: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = LOCATION
        .get_or_init(|| Regex::new(r"(?i)line\s+(\d+)(?:,?\s*col(?:umn)?\s+(\d+))?").ok())
    else {
        return (None, None);
    };

    match re.captures(message) {
        Some(caps) => (
            caps.get(1).and_then(|m| m.as_str().parse().ok()),
            caps.get(2).and_then(|m| m.as_str().parse().ok()),
        ),
        None => (None, None),
    }
}

/// Closest expected name for serde's "unknown field/variant" messages
fn suggestion_for(message: &str) -> Option<String> {
    static UNKNOWN: OnceLock<Option<Regex>> = OnceLock::new();
    static QUOTED: OnceLock<Option<Regex>> = OnceLock::new();

    let unknown = UNKNOWN
        .get_or_init(|| Regex::new(r"unknown (?:field|variant) `([^`]*)`, expected (.*)").ok())
        .as_ref()?;
    let quoted = QUOTED.get_or_init(|| Regex::new(r"`([^`]+)`").ok()).as_ref()?;

    let caps = unknown.captures(message)?;
    let name = caps.get(1)?.as_str();
    let expected = caps.get(2)?.as_str();

    closest_match(
        name,
        quoted
            .captures_iter(expected)
            .filter_map(|c| c.get(1).map(|m| m.as_str())),
    )
}

/// Most similar candidate above the similarity threshold
pub fn closest_match<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    candidates
        .map(|known| (known, jaro_winkler(name, known)))
        .filter(|(_, score)| *score >= SIMILARITY_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(known, _)| known.to_string())
}
