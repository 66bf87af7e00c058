//! Config loading for lazyjson.
//!
//! Loads and validates YAML config files with path expansion.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use log::info;

use crate::config::discovery::DiscoveryResult;
use crate::config::error::ConfigError;
use crate::config::types::{Config, RawConfig, MAX_TITLE_LEN};
use crate::renderer::field::FieldPath;

/// Expand tilde in path to home directory.
///
/// Handles the following cases:
/// - `~/foo` -> `/home/user/foo`
/// - `/absolute/path` -> unchanged
/// - `relative/path` -> unchanged
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }

    path.to_path_buf()
}

/// Load, merge over the defaults and validate one config file.
pub fn load_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let raw = parse(path, &content)?;
    let config = merge(raw);
    validate(path, &config)?;
    Ok(config)
}

/// Load the config chosen by `explicit` or discovery, or the defaults.
///
/// An explicit path must exist. Returns the file that was used, if any.
pub fn load(
    explicit: Option<&Path>,
    discovery: &DiscoveryResult,
) -> Result<(Config, Option<PathBuf>), ConfigError> {
    let chosen = match explicit {
        Some(path) => Some(expand_path(path)),
        None => discovery.winner().map(Path::to_path_buf),
    };

    match chosen {
        Some(path) => {
            let config = load_file(&path)?;
            info!("Loaded config from {}", path.display());
            Ok((config, Some(path)))
        }
        None => Ok((Config::default(), None)),
    }
}

fn parse(path: &Path, content: &str) -> Result<RawConfig, ConfigError> {
    // Empty or comment-only files keep every default
    if content
        .lines()
        .all(|l| l.trim().is_empty() || l.trim_start().starts_with('#'))
    {
        return Ok(RawConfig::default());
    }

    serde_saphyr::from_str(content)
        .map_err(|e| ConfigError::from_parse_message(path.to_path_buf(), e.to_string()))
}

fn merge(raw: RawConfig) -> Config {
    let mut config = Config::default();

    if let Some(fields) = raw.fields {
        config.fields = fields;
    }
    if let Some(mapping) = raw.custom_level_mapping {
        config.custom_level_mapping.extend(
            mapping
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v)),
        );
    }
    if let Some(size) = raw.max_file_size {
        config.max_file_size = size;
    }
    if let Some(ms) = raw.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms);
    }

    config
}

/// Semantic checks that the YAML shape alone cannot express.
pub fn validate(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if config.fields.is_empty() {
        return Err(ConfigError::validation(
            path,
            "fields: at least one field is required",
        ));
    }

    for (i, field) in config.fields.iter().enumerate() {
        let title_len = field.title.chars().count();
        if title_len == 0 || title_len > MAX_TITLE_LEN {
            return Err(ConfigError::validation(
                path,
                format!(
                    "fields[{}].title: must be 1 to {} characters, got {}",
                    i, MAX_TITLE_LEN, title_len
                ),
            ));
        }

        if field.references.is_empty() {
            return Err(ConfigError::validation(
                path,
                format!("fields[{}].ref: at least one reference is required", i),
            ));
        }
        for reference in &field.references {
            FieldPath::parse(reference).map_err(|e| {
                ConfigError::validation(path, format!("fields[{}].ref: {}", i, e))
            })?;
        }

        if let Some(layout) = &field.time_format {
            if !field.kind.is_time() {
                return Err(ConfigError::validation(
                    path,
                    format!(
                        "fields[{}].time_format: only epoch time kinds take a layout",
                        i
                    ),
                ));
            }
            if StrftimeItems::new(layout).any(|item| matches!(item, Item::Error)) {
                return Err(ConfigError::validation(
                    path,
                    format!(
                        "fields[{}].time_format: '{}' is not a valid strftime layout",
                        i, layout
                    ),
                ));
            }
        }
    }

    if config.max_file_size.bytes() == 0 {
        return Err(ConfigError::validation(
            path,
            "max_file_size: must be at least 1 byte",
        ));
    }
    if config.poll_interval.is_zero() {
        return Err(ConfigError::validation(
            path,
            "poll_interval_ms: must be at least 1",
        ));
    }

    Ok(())
}
