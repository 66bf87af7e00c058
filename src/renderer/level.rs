use std::collections::HashMap;

/// Level shown when the value is empty
pub const LEVEL_NONE: &str = "none";

/// Classify a level value.
///
/// The value is lowercased and trimmed, then looked up in `mapping` before
/// the letter-prefix ladder. Anything unrecognized passes through as a
/// custom level.
pub fn classify_level(value: &str, mapping: &HashMap<String, String>) -> String {
    let value = value.trim().to_lowercase();

    if let Some(level) = mapping.get(&value) {
        return level.clone();
    }

    let level = match value.chars().next() {
        None => LEVEL_NONE,
        Some('t') | Some('v') => "trace",
        Some('d') => "debug",
        Some('i') => "info",
        Some('w') => "warn",
        Some('e') => "error",
        Some('f') => "fatal",
        Some('p') => "panic",
        Some(_) => return value,
    };
    level.to_string()
}
