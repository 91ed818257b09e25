//! Path expressions over decoded JSON documents
//!
//! Supported syntax: optional `$` root, `.name`, `['name']` / `["name"]`,
//! `[n]`, `[-n]` (from the end of an array), and `[*]` / `.*` wildcards.

use crate::error::{CollectorError, Result};
use crate::quantity::Quantity;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(i64),
    Wildcard,
}

/// A compiled path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Compile a path expression, reporting syntax problems as plain messages
    pub fn parse(expr: &str) -> std::result::Result<Self, String> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err("path expression is empty".to_string());
        }

        let chars: Vec<char> = expr.chars().collect();
        let mut pos = 0;
        let mut segments = Vec::new();

        if chars[0] == '$' {
            pos = 1;
        } else if chars[0] != '.' && chars[0] != '[' {
            // Bare leading key, e.g. `values[0]`
            let key = read_identifier(&chars, &mut pos);
            if key.is_empty() {
                return Err(format!("unexpected character '{}' at 0", chars[0]));
            }
            segments.push(Segment::Key(key));
        }

        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    pos += 1;
                    match chars.get(pos) {
                        Some('.') => {
                            return Err("recursive descent ('..') is not supported".to_string())
                        }
                        Some('*') => {
                            pos += 1;
                            segments.push(Segment::Wildcard);
                        }
                        _ => {
                            let key = read_identifier(&chars, &mut pos);
                            if key.is_empty() {
                                return Err(format!("expected a key after '.' at {}", pos - 1));
                            }
                            segments.push(Segment::Key(key));
                        }
                    }
                }
                '[' => {
                    let close = find_bracket_close(&chars, pos)?;
                    let inner: String = chars[pos + 1..close].iter().collect();
                    segments.push(parse_bracket(inner.trim())?);
                    pos = close + 1;
                }
                other => return Err(format!("unexpected character '{}' at {}", other, pos)),
            }
        }

        Ok(Self { segments })
    }

    /// Every node the expression matches, with its concrete path, in document order
    pub fn select<'a>(&self, document: &'a Value) -> Vec<(String, &'a Value)> {
        let mut matches = vec![("$".to_string(), document)];

        for segment in &self.segments {
            let mut next = Vec::new();
            for (path, value) in matches {
                match (segment, value) {
                    (Segment::Key(key), Value::Object(map)) => {
                        if let Some(child) = map.get(key) {
                            next.push((child_key_path(&path, key), child));
                        }
                    }
                    (Segment::Index(index), Value::Array(items)) => {
                        let resolved = if *index < 0 {
                            items.len() as i64 + index
                        } else {
                            *index
                        };
                        if let Some(child) =
                            usize::try_from(resolved).ok().and_then(|i| items.get(i))
                        {
                            next.push((format!("{}[{}]", path, resolved), child));
                        }
                    }
                    (Segment::Wildcard, Value::Array(items)) => {
                        for (i, child) in items.iter().enumerate() {
                            next.push((format!("{}[{}]", path, i), child));
                        }
                    }
                    (Segment::Wildcard, Value::Object(map)) => {
                        for (key, child) in map {
                            next.push((child_key_path(&path, key), child));
                        }
                    }
                    _ => {}
                }
            }
            matches = next;
        }

        matches
    }
}

impl FromStr for JsonPath {
    type Err = String;

    fn from_str(expr: &str) -> std::result::Result<Self, String> {
        JsonPath::parse(expr)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut path = "$".to_string();
        for segment in &self.segments {
            path = match segment {
                Segment::Key(key) => child_key_path(&path, key),
                Segment::Index(index) => format!("{}[{}]", path, index),
                Segment::Wildcard => format!("{}[*]", path),
            };
        }
        f.write_str(&path)
    }
}

fn read_identifier(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && !matches!(chars[*pos], '.' | '[' | ']') {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

/// Index of the `]` closing the bracket opened at `open`; a quoted key may contain `]`
fn find_bracket_close(chars: &[char], open: usize) -> std::result::Result<usize, String> {
    let mut pos = open + 1;
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }

    if let Some(&quote) = chars.get(pos).filter(|c| **c == '\'' || **c == '"') {
        pos += chars[pos + 1..]
            .iter()
            .position(|c| *c == quote)
            .map(|offset| offset + 2)
            .ok_or_else(|| format!("unterminated quoted key at {}", pos))?;
    }

    chars[pos..]
        .iter()
        .position(|c| *c == ']')
        .map(|offset| pos + offset)
        .ok_or_else(|| format!("unclosed '[' at {}", open))
}

fn parse_bracket(inner: &str) -> std::result::Result<Segment, String> {
    if inner == "*" {
        return Ok(Segment::Wildcard);
    }

    for quote in ['\'', '"'] {
        if inner.len() >= 2 && inner.starts_with(quote) && inner.ends_with(quote) {
            return Ok(Segment::Key(inner[1..inner.len() - 1].to_string()));
        }
    }

    inner
        .parse::<i64>()
        .map(Segment::Index)
        .map_err(|_| format!("invalid bracket selector '[{}]'", inner))
}

fn is_identifier(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn child_key_path(parent: &str, key: &str) -> String {
    if is_identifier(key) {
        format!("{}.{}", parent, key)
    } else {
        format!("{}['{}']", parent, key)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn numeric_leaf(path: &str, value: &Value) -> Result<Quantity> {
    match value {
        Value::Number(number) => Quantity::from_json_number(number),
        other => Err(CollectorError::TypeMismatch {
            path: path.to_string(),
            found: kind_of(other).to_string(),
        }),
    }
}

/// Extract the numeric samples `path` selects from `document`.
///
/// A matched array contributes its elements in order. No matches yields an
/// empty sequence; any non-numeric match fails with `TypeMismatch`.
pub fn extract(document: &Value, path: &JsonPath) -> Result<Vec<Quantity>> {
    let mut samples = Vec::new();

    for (match_path, value) in path.select(document) {
        match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    samples.push(numeric_leaf(&format!("{}[{}]", match_path, i), item)?);
                }
            }
            other => samples.push(numeric_leaf(&match_path, other)?),
        }
    }

    Ok(samples)
}
