//! Path references into a parsed JSON record.
//!
//! Accepted forms: `$.a.b`, `$["key"]`, `$['key']`, `$.list[0]` and the
//! bare dotted `a.b`.

use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A compiled path reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
    pub reference: String,
    pub message: String,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid reference '{}': {}", self.reference, self.message)
    }
}

impl std::error::Error for PathError {}

impl FieldPath {
    pub fn parse(reference: &str) -> Result<Self, PathError> {
        let fail = |message: &str| PathError {
            reference: reference.to_string(),
            message: message.to_string(),
        };

        let trimmed = reference.trim();
        let rest = match trimmed.strip_prefix('$') {
            Some(rest) => rest,
            None if trimmed.is_empty() => return Err(fail("reference is empty")),
            // Bare dotted form
            None => {
                let mut segments = Vec::new();
                let (head, tail) = split_key(trimmed);
                if head.is_empty() {
                    return Err(fail("empty key"));
                }
                segments.push(Segment::Key(head.to_string()));
                return parse_segments(tail, segments).map_err(|m| fail(&m));
            }
        };

        if rest.is_empty() {
            return Ok(Self {
                segments: Vec::new(),
            });
        }
        if !rest.starts_with('.') && !rest.starts_with('[') {
            return Err(fail("expected '.' or '[' after '$'"));
        }
        parse_segments(rest, Vec::new()).map_err(|m| fail(&m))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walk `value` along the path
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                Segment::Key(key) => current.as_object()?.get(key),
                Segment::Index(index) => current.as_array()?.get(*index),
            })
    }
}

fn parse_segments(mut rest: &str, mut segments: Vec<Segment>) -> Result<FieldPath, String> {
    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            let (key, tail) = split_key(after_dot);
            if key.is_empty() {
                return Err("empty key".to_string());
            }
            segments.push(Segment::Key(key.to_string()));
            rest = tail;
        } else if let Some(after_bracket) = rest.strip_prefix('[') {
            let close = after_bracket
                .find(']')
                .ok_or_else(|| "unclosed '['".to_string())?;
            let inner = after_bracket[..close].trim();
            segments.push(parse_bracket(inner)?);
            rest = &after_bracket[close + 1..];
        } else {
            return Err(format!("unexpected '{}'", rest));
        }
    }
    Ok(FieldPath { segments })
}

fn parse_bracket(inner: &str) -> Result<Segment, String> {
    for quote in ['"', '\''] {
        if let Some(quoted) = inner.strip_prefix(quote) {
            return quoted
                .strip_suffix(quote)
                .map(|key| Segment::Key(key.to_string()))
                .ok_or_else(|| format!("unterminated quote in [{}]", inner));
        }
    }
    inner
        .parse::<usize>()
        .map(Segment::Index)
        .map_err(|_| format!("expected an index or a quoted key in [{}]", inner))
}

/// Split a dotted key at the next '.' or '['
fn split_key(s: &str) -> (&str, &str) {
    let end = s.find(['.', '[']).unwrap_or(s.len());
    s.split_at(end)
}

/// Text shown for a resolved value: strings unquoted, `null` literally,
/// containers as compact JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => value.to_string(),
    }
}

/// Resolve the first reference that matches, as display text.
pub fn extract_first(value: &Value, paths: &[FieldPath]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| path.resolve(value))
        .map(value_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(k: &str) -> Segment {
        Segment::Key(k.to_string())
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(FieldPath::parse("$.a.b").unwrap().segments(), &[key("a"), key("b")]);
        assert_eq!(
            FieldPath::parse("$[\"@timestamp\"]").unwrap().segments(),
            &[key("@timestamp")]
        );
        assert_eq!(FieldPath::parse("$['a.b']").unwrap().segments(), &[key("a.b")]);
        assert_eq!(
            FieldPath::parse("$.list[0].x").unwrap().segments(),
            &[key("list"), Segment::Index(0), key("x")]
        );
        assert_eq!(FieldPath::parse("msg").unwrap().segments(), &[key("msg")]);
        assert_eq!(
            FieldPath::parse("err.kind").unwrap().segments(),
            &[key("err"), key("kind")]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("$..a").is_err());
        assert!(FieldPath::parse("$[abc]").is_err());
        assert!(FieldPath::parse("$[\"open").is_err());
        assert!(FieldPath::parse("$a").is_err());
        assert!(FieldPath::parse("$.a[1").is_err());
    }

    #[test]
    fn test_resolve() {
        let value = json!({"a": {"b": 1}, "list": [{"x": "y"}], "n": null});

        let path = FieldPath::parse("$.a.b").unwrap();
        assert_eq!(path.resolve(&value), Some(&json!(1)));

        let path = FieldPath::parse("$.list[0].x").unwrap();
        assert_eq!(path.resolve(&value), Some(&json!("y")));

        let path = FieldPath::parse("$.list[3]").unwrap();
        assert_eq!(path.resolve(&value), None);

        let path = FieldPath::parse("$.a[0]").unwrap();
        assert_eq!(path.resolve(&value), None);
    }

    #[test]
    fn test_extract_first_tries_in_order() {
        let value = json!({"msg": "second", "n": null});
        let paths = vec![
            FieldPath::parse("$.message").unwrap(),
            FieldPath::parse("$.msg").unwrap(),
        ];
        assert_eq!(extract_first(&value, &paths).as_deref(), Some("second"));

        let paths = vec![FieldPath::parse("$.n").unwrap()];
        assert_eq!(extract_first(&value, &paths).as_deref(), Some("null"));

        let paths = vec![FieldPath::parse("$.missing").unwrap()];
        assert_eq!(extract_first(&value, &paths), None);
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!("s")), "s");
        assert_eq!(value_text(&json!(1.5)), "1.5");
        assert_eq!(value_text(&json!(true)), "true");
        assert_eq!(value_text(&json!({"k": [1]})), r#"{"k":[1]}"#);
    }
}
