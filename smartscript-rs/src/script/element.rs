//! Elements: the typed units found inside a tag.
//!
//! A tag body such as `= i "x" @decfmt 2 *` is split into whitespace-separated
//! chunks (quoted strings stay whole) and each chunk is classified as an
//! [`Element`].  Classification is tried in a fixed order: integer, double,
//! variable, function, string, operator.  The first match wins.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::value::Value;

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+$").unwrap());
static DOUBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$").unwrap()
});
static IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

/// Line separator substituted for a `\r\n` escape inside string literals.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Operator symbols recognised by the parser.  Only the first four evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Operator {
    pub fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "*" => Operator::Mul,
            "/" => Operator::Div,
            "^" => Operator::Pow,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Pow => "^",
        }
    }
}

/// One parsed unit of a tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Integer(i64),
    Double(f64),
    /// String literal with quotes stripped and escapes resolved.
    Str(String),
    Variable(String),
    /// Function reference; the name is stored without the leading `@`.
    Function(String),
    Operator(Operator),
}

impl Element {
    /// Classify a single chunk, or `None` if it is not a valid element.
    pub fn classify(chunk: &str) -> Option<Element> {
        if INTEGER.is_match(chunk) {
            if let Ok(n) = chunk.parse::<i64>() {
                return Some(Element::Integer(n));
            }
        }
        if DOUBLE.is_match(chunk) {
            // `1e999` overflows to infinity; it is not a literal.
            match chunk.parse::<f64>() {
                Ok(x) if x.is_finite() => return Some(Element::Double(x)),
                _ => return None,
            }
        }
        if is_identifier(chunk) {
            return Some(Element::Variable(chunk.to_owned()));
        }
        if let Some(name) = chunk.strip_prefix('@') {
            if is_identifier(name) {
                return Some(Element::Function(name.to_owned()));
            }
        }
        if chunk.len() >= 2 && chunk.starts_with('"') && chunk.ends_with('"') {
            return Some(Element::Str(unescape(&chunk[1..chunk.len() - 1])));
        }
        Operator::from_symbol(chunk).map(Element::Operator)
    }

    /// Literal value of a constant element; `None` for the other kinds.
    pub fn constant(&self) -> Option<Value> {
        match self {
            Element::Integer(n) => Some(Value::Int(*n)),
            Element::Double(x) => Some(Value::Double(*x)),
            Element::Str(s) => Some(Value::Str(s.clone())),
            _ => None,
        }
    }

    /// Source-text projection of this element.
    ///
    /// Parsing the result with [`Element::classify`] yields an equal element.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Integer(n) => write!(f, "{n}"),
            Element::Double(x) => write!(f, "{}", Value::Double(*x)),
            Element::Str(s) => write!(f, "\"{}\"", escape(s)),
            Element::Variable(name) => f.write_str(name),
            Element::Function(name) => write!(f, "@{name}"),
            Element::Operator(op) => f.write_str(op.symbol()),
        }
    }
}

/// Variable-name grammar: `[A-Za-z][A-Za-z0-9_]*`.
pub fn is_identifier(s: &str) -> bool {
    IDENT.is_match(s)
}

/// Resolve the escapes of a quoted string body.
///
/// `\r\n` as a pair becomes [`LINE_SEPARATOR`]; `\\`, `\"`, `\n`, `\r` and
/// `\t` map to their characters; any other backslash is kept verbatim.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('r') => {
                let mut ahead = chars.clone();
                if ahead.next() == Some('\\') && ahead.next() == Some('n') {
                    chars = ahead;
                    out.push_str(LINE_SEPARATOR);
                } else {
                    out.push('\r');
                }
            }
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            // Raw LF: the `\r\n` escape means LINE_SEPARATOR.
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                out.push_str("\\r\n");
            }
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Split a tag body into chunks on whitespace, keeping quoted strings whole.
///
/// A quote only opens a string at the start of a chunk.  Inside a string a
/// backslash protects the next character, so `\"` does not close it.
pub fn split_chunks(body: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_str = false;

    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if in_str {
            current.push(ch);
            match ch {
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                '"' => {
                    chunks.push(std::mem::take(&mut current));
                    in_str = false;
                }
                _ => {}
            }
        } else if ch.is_whitespace() {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
        } else {
            if ch == '"' && current.is_empty() {
                in_str = true;
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

// ── Tests ─────────────────────────────────────────────────────────────────────
