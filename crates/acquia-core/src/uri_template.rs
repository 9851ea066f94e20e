//! URI template expansion for request paths.
//!
//! Supports the two RFC 6570 level-2 forms used by the Cloud API endpoint
//! table: simple expansion `{name}`, which percent-encodes everything outside
//! the unreserved set, and reserved expansion `{+name}`, which additionally
//! keeps reserved characters such as `/` intact. Any other operator is
//! rejected at parse time.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Variable mapping consumed by [`UriTemplate::expand`].
///
/// Variables that the template never references are ignored, which lets
/// callers keep one mapping for a whole family of endpoints.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Variables {
    values: BTreeMap<String, String>,
}

impl Variables {
    /// Create a new, empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Display,
    {
        self.push(name, value);
        self
    }

    /// Insert or replace a variable.
    pub fn push<T>(&mut self, name: impl Into<String>, value: T)
    where
        T: Display,
    {
        self.values.insert(name.into(), value.to_string());
    }

    /// Insert a variable only when the value is present.
    pub fn push_opt<T>(&mut self, name: impl Into<String>, value: Option<T>)
    where
        T: Display,
    {
        if let Some(value) = value {
            self.push(name, value);
        }
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Returns true if the mapping holds `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of variables in the mapping.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no variables have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Variables
where
    K: Into<String>,
    V: Display,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (name, value) in iter {
            vars.push(name, value);
        }
        vars
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Simple(String),
    Reserved(String),
}

/// A parsed URI template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl UriTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateSyntax`] for unbalanced braces, empty or
    /// malformed placeholder names, and unsupported operators.
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices();

        while let Some((start, ch)) = chars.next() {
            match ch {
                '{' => {
                    let mut expression = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => {
                                return Err(Error::TemplateSyntax(format!(
                                    "nested `{{` in expression starting at offset {start} of `{template}`"
                                )));
                            }
                            other => expression.push(other),
                        }
                    }
                    if !closed {
                        return Err(Error::TemplateSyntax(format!(
                            "unterminated expression at offset {start} of `{template}`"
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_expression(&expression, template)?);
                }
                '}' => {
                    return Err(Error::TemplateSyntax(format!(
                        "unmatched `}}` at offset {start} of `{template}`"
                    )));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Expand the template against `vars`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndefinedVariable`] naming the first placeholder that
    /// has no entry in `vars`, or [`Error::InvalidEndpoint`] when a simple
    /// expansion in the path is exactly `.` or `..`. Such a value would form a
    /// dot segment that URL parsing resolves away, in either raw or
    /// percent-encoded form.
    pub fn expand(&self, vars: &Variables) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Simple(name) => {
                    let value = lookup(vars, name)?;
                    if matches!(value, "." | "..") && !out.contains('?') {
                        return Err(Error::InvalidEndpoint(format!(
                            "variable `{name}` expands to the dot segment `{value}` in `{}`",
                            self.source
                        )));
                    }
                    encode_into(&mut out, value, false);
                }
                Segment::Reserved(name) => {
                    let value = lookup(vars, name)?;
                    encode_into(&mut out, value, true);
                }
            }
        }
        Ok(out)
    }

    /// Names of the variables the template references, in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Simple(name) | Segment::Reserved(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// The template source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for UriTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse and expand in one step.
///
/// # Errors
///
/// See [`UriTemplate::parse`] and [`UriTemplate::expand`].
pub fn expand(template: &str, vars: &Variables) -> Result<String> {
    UriTemplate::parse(template)?.expand(vars)
}

fn parse_expression(expression: &str, template: &str) -> Result<Segment> {
    let (reserved, name) = match expression.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, expression),
    };

    if let Some(op) = name.chars().next().filter(|c| "#./;?&=,!@|".contains(*c)) {
        return Err(Error::TemplateSyntax(format!(
            "unsupported operator `{op}` in `{{{expression}}}` of `{template}`"
        )));
    }
    if name.is_empty() {
        return Err(Error::TemplateSyntax(format!(
            "empty expression in `{template}`"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(Error::TemplateSyntax(format!(
            "invalid variable name `{name}` in `{template}`"
        )));
    }

    let name = name.to_string();
    Ok(if reserved {
        Segment::Reserved(name)
    } else {
        Segment::Simple(name)
    })
}

fn lookup<'a>(vars: &'a Variables, name: &str) -> Result<&'a str> {
    vars.get(name)
        .ok_or_else(|| Error::UndefinedVariable(name.to_string()))
}

const fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

const fn is_reserved(byte: u8) -> bool {
    matches!(
        byte,
        b':' | b'/'
            | b'?'
            | b'#'
            | b'['
            | b']'
            | b'@'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
    )
}

fn encode_into(out: &mut String, value: &str, allow_reserved: bool) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        let keep = is_unreserved(byte) || (allow_reserved && is_reserved(byte));
        if keep {
            out.push(char::from(byte));
        } else if allow_reserved
            && byte == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            // pct-encoded triplets pass through reserved expansion untouched
            out.push_str(&value[i..i + 3]);
            i += 3;
            continue;
        } else {
            out.push('%');
            out.push(char::from(HEX[usize::from(byte >> 4)]));
            out.push(char::from(HEX[usize::from(byte & 0x0F)]));
        }
        i += 1;
    }
}
