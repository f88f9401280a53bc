//! Structured header codec for resource files
//!
//! Every resource file is a structured header between `---` delimiter lines
//! followed by a free-form markdown body. The header is an *ordered* key-value
//! mapping covering a deliberately restricted grammar: single-line strings,
//! integers, `YYYY-MM-DD` dates, inline string lists (`[a, b]`), and inline
//! typed-reference lists (`[task:1, prompt:2]`). Anything outside that subset
//! (block sequences, multi-line scalars, anchors/aliases, nested mappings)
//! fails parsing rather than being silently accepted, so a hand-edit that
//! strays outside the grammar is surfaced instead of corrupted on re-encode.
//!
//! Key order is preserved through a parse/encode cycle, unknown keys
//! round-trip unchanged, and `parse(encode(h, b)) == (h, b)` holds for every
//! header in the supported subset. Scalars that would re-parse as a different
//! type (e.g. a string of digits) are quoted on encode.
//!
//! Ambiguity rule: an inline list whose every element is unquoted and matches
//! `kind:id` decodes as a typed-reference list; quoting an element forces a
//! string list. List items containing commas or brackets are outside the
//! supported subset.

use chrono::NaiveDate;
use thiserror::Error;

use super::reference::Reference;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("missing `---` header delimiter")]
    MissingDelimiter,

    #[error("header is never closed by a `---` line")]
    Unterminated,

    #[error("unsupported header syntax at line {line}: {reason}")]
    Unsupported { line: usize, reason: String },

    #[error("malformed header line {line}: {text:?}")]
    Malformed { line: usize, text: String },
}

/// A single header value in the supported subset.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Date(NaiveDate),
    List(Vec<String>),
    Refs(Vec<Reference>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns any scalar rendered as text, `None` for lists.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Int(n) => Some(n.to_string()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            _ => None,
        }
    }

    /// Returns an integer, also accepting a string scalar that parses as one
    /// (same leniency as [`Value::as_date`] for hand-quoted headers).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns a date, also accepting a string scalar that parses as one
    /// (hand-edited headers sometimes quote dates).
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Str(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_refs(&self) -> Option<&[Reference]> {
        match self {
            Value::Refs(refs) => Some(refs),
            _ => None,
        }
    }

    fn encode(&self) -> String {
        match self {
            Value::Str(s) => encode_scalar(s),
            Value::Int(n) => n.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(|i| encode_list_item(i)).collect();
                format!("[{}]", rendered.join(", "))
            }
            Value::Refs(refs) => {
                let rendered: Vec<String> = refs.iter().map(|r| r.to_string()).collect();
                format!("[{}]", rendered.join(", "))
            }
        }
    }

    fn parse(raw: &str, line: usize) -> Result<Value, ParseError> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Ok(Value::Str(String::new()));
        }

        match raw.chars().next() {
            Some('|') | Some('>') => {
                return Err(ParseError::Unsupported {
                    line,
                    reason: "multi-line scalars are not supported".to_string(),
                })
            }
            Some('&') => {
                return Err(ParseError::Unsupported {
                    line,
                    reason: "anchors are not supported".to_string(),
                })
            }
            Some('*') => {
                return Err(ParseError::Unsupported {
                    line,
                    reason: "aliases are not supported".to_string(),
                })
            }
            Some('{') => {
                return Err(ParseError::Unsupported {
                    line,
                    reason: "inline mappings are not supported".to_string(),
                })
            }
            Some('[') => return parse_list(raw, line),
            _ => {}
        }

        if let Some(unquoted) = strip_quotes(raw) {
            return Ok(Value::Str(unquoted.to_string()));
        }

        if let Ok(n) = raw.parse::<i64>() {
            return Ok(Value::Int(n));
        }

        if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(Value::Date(d));
        }

        Ok(Value::Str(raw.to_string()))
    }
}

/// Ordered header mapping. Duplicate keys are preserved as written; lookups
/// and replacements address the first occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    entries: Vec<(String, Value)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a resource file into its header and verbatim body.
    ///
    /// The body is everything after the closing `---` line, returned exactly
    /// as written. Blank lines and `#` comment lines inside the header are
    /// tolerated (and not preserved); indentation is not, because indentation
    /// means nesting and nesting is outside the grammar.
    pub fn parse(text: &str) -> Result<(Header, String), ParseError> {
        let (first, mut rest) = split_line(text);
        if first.trim_end() != "---" {
            return Err(ParseError::MissingDelimiter);
        }

        let mut entries = Vec::new();
        let mut line_no = 1;

        loop {
            if rest.is_empty() {
                return Err(ParseError::Unterminated);
            }

            let (line, after) = split_line(rest);
            rest = after;
            line_no += 1;

            let line = line.trim_end();
            if line == "---" {
                break;
            }

            let stripped = line.trim_start();
            if stripped.is_empty() || stripped.starts_with('#') {
                continue;
            }

            if stripped.len() != line.len() {
                return Err(ParseError::Unsupported {
                    line: line_no,
                    reason: "indented lines (nested mappings) are not supported".to_string(),
                });
            }

            if line == "-" || line.starts_with("- ") {
                return Err(ParseError::Unsupported {
                    line: line_no,
                    reason: "block sequences are not supported".to_string(),
                });
            }

            let Some((key, raw_value)) = line.split_once(':') else {
                return Err(ParseError::Malformed {
                    line: line_no,
                    text: line.to_string(),
                });
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(ParseError::Malformed {
                    line: line_no,
                    text: line.to_string(),
                });
            }

            let value = Value::parse(raw_value, line_no)?;
            entries.push((key.to_string(), value));
        }

        Ok((Header { entries }, rest.to_string()))
    }

    /// Renders the header followed by the body, verbatim.
    pub fn encode(&self, body: &str) -> String {
        let mut out = String::from("---\n");
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&value.encode());
            out.push('\n');
        }
        out.push_str("---\n");
        out.push_str(body);
        out
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replaces the value in place if the key exists (preserving its
    /// position), otherwise appends the pair at the end.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn split_line(s: &str) -> (&str, &str) {
    match s.find('\n') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}

/// Strips one layer of matching surrounding quotes, if present.
fn strip_quotes(s: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}

fn parse_list(raw: &str, line: usize) -> Result<Value, ParseError> {
    if !raw.ends_with(']') {
        return Err(ParseError::Unsupported {
            line,
            reason: "unterminated inline list".to_string(),
        });
    }

    let inner = &raw[1..raw.len() - 1];
    if inner.trim().is_empty() {
        return Ok(Value::List(Vec::new()));
    }

    let mut items = Vec::new();
    let mut any_quoted = false;
    for piece in inner.split(',') {
        let piece = piece.trim();
        if let Some(unquoted) = strip_quotes(piece) {
            any_quoted = true;
            items.push(unquoted.to_string());
        } else if !piece.is_empty() {
            items.push(piece.to_string());
        }
        // bare empty items (trailing commas) are dropped
    }

    if !any_quoted && !items.is_empty() {
        let refs: Result<Vec<Reference>, _> = items.iter().map(|i| i.parse()).collect();
        if let Ok(refs) = refs {
            return Ok(Value::Refs(refs));
        }
    }

    Ok(Value::List(items))
}

/// True when a bare rendering of `s` would re-parse as something other than
/// the same string.
fn scalar_needs_quotes(s: &str) -> bool {
    if s.is_empty() || s != s.trim() {
        return true;
    }
    if s.parse::<i64>().is_ok() || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() {
        return true;
    }
    if strip_quotes(s).is_some() {
        return true;
    }
    matches!(s.chars().next(), Some('|' | '>' | '&' | '*' | '{' | '['))
}

fn quote(s: &str) -> String {
    if !s.contains('"') {
        format!("\"{}\"", s)
    } else if !s.contains('\'') {
        format!("'{}'", s)
    } else {
        // Contains both quote characters: outside the supported subset,
        // emitted bare.
        s.to_string()
    }
}

fn encode_scalar(s: &str) -> String {
    if scalar_needs_quotes(s) {
        quote(s)
    } else {
        s.to_string()
    }
}

fn encode_list_item(s: &str) -> String {
    let ref_shaped = s.parse::<Reference>().is_ok();
    if s.is_empty() || s != s.trim() || ref_shaped || strip_quotes(s).is_some() {
        quote(s)
    } else {
        s.to_string()
    }
}
