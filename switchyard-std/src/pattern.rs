//! Regex-backed path pattern compiler.
//!
//! Turns Express-style pattern strings into [`PathMatcher`]s:
//!
//! | pattern          | meaning                                             |
//! |------------------|-----------------------------------------------------|
//! | `/users/:id`     | named segment, anything but `/`                     |
//! | `/files/:name?`  | optional named segment (the leading `/` goes too)   |
//! | `/:id(\\d+)`     | named segment constrained by a custom regex         |
//! | `/:path*`        | named segment that may span further segments        |
//! | `/file.:ext`     | named segment after a `.`, anything but `/` or `.`  |
//! | `/assets/*`      | unnamed positional capture, matches anything        |
//! | `/user(s)?`      | bare group, unnamed positional capture              |
//! | `/ab?cd`         | `?` or `+` quantifies the preceding char or group   |
//!
//! A `*` is always the wildcard, never a quantifier.
//!
//! Groups inside a custom segment regex must be non-capturing (`(?:..)`),
//! otherwise captures and keys drift apart.
//!
//! Raw [`Regex`] values are used as given. Their groups become keys, named
//! after the group name when there is one and numbered otherwise.

use regex::Regex;
use std::fmt;
use switchyard_core::{BoxError, ConfigError, PathKey, PathMatch, PathMatcher};

/// Where a pattern comes from.
#[derive(Debug, Clone)]
pub enum PathSource {
    /// A pattern string.
    Pattern(String),
    /// A raw regular expression.
    Regex(Regex),
}

impl From<&str> for PathSource {
    fn from(value: &str) -> Self {
        PathSource::Pattern(value.to_string())
    }
}

impl From<String> for PathSource {
    fn from(value: String) -> Self {
        PathSource::Pattern(value)
    }
}

impl From<&String> for PathSource {
    fn from(value: &String) -> Self {
        PathSource::Pattern(value.clone())
    }
}

impl From<Regex> for PathSource {
    fn from(value: Regex) -> Self {
        PathSource::Regex(value)
    }
}

impl fmt::Display for PathSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSource::Pattern(pattern) => f.write_str(pattern),
            PathSource::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// Compile options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathOptions {
    /// Match case-sensitively.
    pub sensitive: bool,
    /// Treat a trailing slash as significant.
    pub strict: bool,
    /// Require the whole path to match; otherwise a prefix ending at a
    /// segment boundary is enough.
    pub end: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            sensitive: false,
            strict: false,
            end: true,
        }
    }
}

impl PathOptions {
    /// Options for prefix (middleware) matching.
    pub fn prefix(sensitive: bool) -> Self {
        Self {
            sensitive,
            strict: false,
            end: false,
        }
    }

    /// Options for whole-path (route) matching.
    pub fn exact(sensitive: bool, strict: bool) -> Self {
        Self {
            sensitive,
            strict,
            end: true,
        }
    }
}

#[derive(Debug, Clone)]
enum Kind {
    /// `/` in prefix mode: matches everything, consumes nothing.
    Slash,
    /// `*`: matches everything, captures it whole.
    Star,
    /// Compiled pattern; group 1 holds the matched portion.
    Compiled(Regex),
    /// User regex, used as given.
    Raw(Regex),
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    kind: Kind,
    keys: Vec<PathKey>,
}

impl PathPattern {
    /// Compile `source` with `options`.
    pub fn compile(
        source: impl Into<PathSource>,
        options: PathOptions,
    ) -> Result<Self, ConfigError> {
        let source = source.into();
        let rendered = source.to_string();
        let pattern = match source {
            PathSource::Regex(regex) => {
                let keys = raw_keys(&regex);
                return Ok(Self {
                    source: rendered,
                    kind: Kind::Raw(regex),
                    keys,
                });
            }
            PathSource::Pattern(pattern) => pattern,
        };

        if pattern == "/" && !options.end {
            return Ok(Self {
                source: rendered,
                kind: Kind::Slash,
                keys: Vec::new(),
            });
        }
        if pattern == "*" {
            return Ok(Self {
                source: rendered,
                kind: Kind::Star,
                keys: vec![PathKey::positional(0)],
            });
        }

        let invalid = |source: BoxError| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        };
        let (body, keys) = translate(&pattern).map_err(invalid)?;

        let mut expr = String::with_capacity(body.len() + 16);
        if !options.sensitive {
            expr.push_str("(?i)");
        }
        expr.push_str("^(");
        expr.push_str(&body);
        if !options.strict {
            expr.push_str(if pattern.ends_with('/') { "?" } else { "/?" });
        }
        expr.push(')');
        if options.end {
            expr.push('$');
        } else if !(options.strict && pattern.ends_with('/')) {
            expr.push_str("(?:/|$)");
        }

        let regex = Regex::new(&expr).map_err(|e| invalid(Box::new(e)))?;
        Ok(Self {
            source: rendered,
            kind: Kind::Compiled(regex),
            keys,
        })
    }

    /// The `/` prefix pattern: matches every path and consumes nothing.
    pub fn root() -> Self {
        Self {
            source: "/".to_string(),
            kind: Kind::Slash,
            keys: Vec::new(),
        }
    }

    /// The pattern as registered.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PathMatcher for PathPattern {
    fn test(&self, path: &str) -> Option<PathMatch> {
        let (regex, first) = match &self.kind {
            Kind::Slash => {
                return Some(PathMatch::default());
            }
            Kind::Star => {
                return Some(PathMatch {
                    offset: 0,
                    matched_len: path.len(),
                    captures: vec![Some(path.to_string())],
                });
            }
            Kind::Compiled(regex) => (regex, 1),
            Kind::Raw(regex) => (regex, 0),
        };

        let caps = regex.captures(path)?;
        let whole = caps.get(first)?;
        Some(PathMatch {
            offset: whole.start(),
            matched_len: whole.len(),
            captures: (first + 1..caps.len())
                .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                .collect(),
        })
    }

    fn keys(&self) -> &[PathKey] {
        &self.keys
    }
}

enum Piece {
    Literal(char),
    Group(String),
    Raw(String),
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Translate a pattern string into a regex body and its keys.
fn translate(pattern: &str) -> Result<(String, Vec<PathKey>), BoxError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut pieces = Vec::with_capacity(chars.len());
    let mut keys = Vec::new();
    let mut positional = 0;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                pieces.push(Piece::Literal(chars.get(i + 1).copied().unwrap_or('\\')));
                i += 2;
            }
            ':' if chars.get(i + 1).copied().is_some_and(is_word) => {
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && is_word(chars[j]) {
                    j += 1;
                }
                let name: String = chars[start..j].iter().collect();

                let mut custom = None;
                if chars.get(j) == Some(&'(') {
                    let (inner, after) = group(&chars, j)?;
                    custom = Some(inner);
                    j = after;
                }
                let star = chars.get(j) == Some(&'*');
                if star {
                    j += 1;
                }
                let optional = chars.get(j) == Some(&'?');
                if optional {
                    j += 1;
                }

                let format = matches!(pieces.last(), Some(Piece::Literal('.')));
                if format {
                    pieces.pop();
                }
                let slash = matches!(pieces.last(), Some(Piece::Literal('/')));
                if slash {
                    pieces.pop();
                }

                let fmt = if format { r"\." } else { "" };
                let slash = if slash { "/" } else { "" };
                let inner = custom.unwrap_or_else(|| format!("[^/{fmt}]+?"));
                let tail = if star {
                    format!("(?:[/{fmt}].+?)?")
                } else {
                    String::new()
                };
                let (lead, inside, quant) = if optional {
                    ("", slash, "?")
                } else {
                    (slash, "", "")
                };
                pieces.push(Piece::Raw(format!(
                    "{lead}(?:{fmt}{inside}({inner}{tail})){quant}"
                )));
                keys.push(PathKey {
                    name,
                    optional,
                });
                i = j;
            }
            '*' => {
                pieces.push(Piece::Raw("(.*)".to_string()));
                keys.push(PathKey::positional(positional));
                positional += 1;
                i += 1;
            }
            '?' | '+' if matches!(pieces.last(), Some(Piece::Literal(_) | Piece::Group(_))) => {
                pieces.push(Piece::Raw(chars[i].to_string()));
                i += 1;
            }
            '(' => {
                let (inner, after) = group(&chars, i)?;
                pieces.push(Piece::Group(inner));
                keys.push(PathKey::positional(positional));
                positional += 1;
                i = after;
            }
            c => {
                pieces.push(Piece::Literal(c));
                i += 1;
            }
        }
    }

    let mut body = String::with_capacity(pattern.len() * 2);
    let mut buf = [0u8; 4];
    for piece in pieces {
        match piece {
            Piece::Literal(c) => body.push_str(&regex::escape(c.encode_utf8(&mut buf))),
            Piece::Group(inner) => {
                body.push('(');
                body.push_str(&inner);
                body.push(')');
            }
            Piece::Raw(raw) => body.push_str(&raw),
        }
    }
    Ok((body, keys))
}

/// Read the parenthesised group opening at `open`.
///
/// Returns the text between the parentheses and the index after the close.
fn group(chars: &[char], open: usize) -> Result<(String, usize), BoxError> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((chars[open + 1..i].iter().collect(), i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(format!("unbalanced parenthesis at offset {open}").into())
}

fn raw_keys(regex: &Regex) -> Vec<PathKey> {
    let mut positional = 0;
    regex
        .capture_names()
        .skip(1)
        .map(|name| match name {
            Some(name) => PathKey::named(name),
            None => {
                let key = PathKey::positional(positional);
                positional += 1;
                key
            }
        })
        .collect()
}
