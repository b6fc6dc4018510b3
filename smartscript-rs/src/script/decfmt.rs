//! Decimal pattern formatting for the `@decfmt` built-in.
//!
//! Supports the usual decimal pattern subset:
//!
//! | Symbol | Meaning                                          |
//! |--------|--------------------------------------------------|
//! | `0`    | digit, always shown                              |
//! | `#`    | digit, omitted when it would be a redundant zero |
//! | `.`    | decimal separator                                |
//! | `,`    | grouping separator (group size = digits after it)|
//! | `%`    | in prefix/suffix: multiply by 100                |
//! | `'x'`  | quoted literal text                              |
//!
//! Anything before the first digit symbol is a prefix, anything after the
//! last one is a suffix.  A `;` negative subpattern is ignored.  Rounding
//! works on the exact binary value of the number.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("pattern {0:?} has no digit placeholders")]
    NoDigits(String),
    #[error("pattern {0:?} has more than one decimal separator")]
    MultipleDecimalPoints(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalPattern {
    prefix: String,
    suffix: String,
    min_int: usize,
    min_frac: usize,
    max_frac: usize,
    grouping: Option<usize>,
    percent: bool,
}

impl DecimalPattern {
    pub fn parse(pattern: &str) -> Result<Self, FormatError> {
        let positive = pattern.split(';').next().unwrap_or_default();
        let is_body = |c: char| matches!(c, '0' | '#' | '.' | ',');

        let (prefix_raw, rest) = split_literal(positive, is_body);
        let body_len = rest.find(|c: char| !is_body(c)).unwrap_or(rest.len());
        let (body, suffix_raw) = rest.split_at(body_len);

        if !body.contains(['0', '#']) {
            return Err(FormatError::NoDigits(pattern.to_owned()));
        }
        let mut parts = body.split('.');
        let int_part = parts.next().unwrap_or_default();
        let frac_part = parts.next().unwrap_or_default();
        if parts.next().is_some() {
            return Err(FormatError::MultipleDecimalPoints(pattern.to_owned()));
        }

        let grouping = int_part
            .rfind(',')
            .map(|i| int_part[i + 1..].chars().filter(|&c| c == '0' || c == '#').count())
            .filter(|&n| n > 0);

        let prefix = unquote(prefix_raw);
        let suffix = unquote(suffix_raw);
        let percent = has_unquoted(prefix_raw, '%') || has_unquoted(suffix_raw, '%');

        Ok(DecimalPattern {
            prefix,
            suffix,
            min_int: int_part.chars().filter(|&c| c == '0').count(),
            min_frac: frac_part.chars().filter(|&c| c == '0').count(),
            max_frac: frac_part.chars().filter(|&c| c == '0' || c == '#').count(),
            grouping,
            percent,
        })
    }

    pub fn format(&self, number: f64) -> String {
        if number.is_nan() {
            return "NaN".to_owned();
        }
        let scaled = if self.percent { number * 100.0 } else { number };
        if scaled.is_infinite() {
            let sign = if scaled < 0.0 { "-" } else { "" };
            return format!("{sign}{}\u{221E}{}", self.prefix, self.suffix);
        }

        let rounded = format!("{:.*}", self.max_frac, scaled.abs());
        let (int_digits, frac_digits) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));

        let mut frac = frac_digits.to_owned();
        while frac.len() > self.min_frac && frac.ends_with('0') {
            frac.pop();
        }

        let mut int = int_digits.trim_start_matches('0').to_owned();
        while int.len() < self.min_int {
            int.insert(0, '0');
        }
        if int.is_empty() && frac.is_empty() {
            int.push('0');
        }
        if let Some(size) = self.grouping {
            int = group(&int, size);
        }

        let is_zero = rounded.chars().all(|c| c == '0' || c == '.');
        let mut out = String::new();
        if scaled.is_sign_negative() && !is_zero {
            out.push('-');
        }
        out.push_str(&self.prefix);
        out.push_str(&int);
        if !frac.is_empty() {
            out.push('.');
            out.push_str(&frac);
        }
        out.push_str(&self.suffix);
        out
    }
}

/// Format `number` with a one-off pattern.
pub fn format(pattern: &str, number: f64) -> Result<String, FormatError> {
    Ok(DecimalPattern::parse(pattern)?.format(number))
}

/// Split at the first body symbol that is not inside quotes.
fn split_literal(s: &str, is_body: impl Fn(char) -> bool) -> (&str, &str) {
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        if c == '\'' {
            quoted = !quoted;
        } else if !quoted && is_body(c) {
            return s.split_at(i);
        }
    }
    (s, "")
}

fn unquote(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn has_unquoted(s: &str, needle: char) -> bool {
    let mut quoted = false;
    s.chars().any(|c| {
        if c == '\'' {
            quoted = !quoted;
        }
        !quoted && c == needle
    })
}

fn group(digits: &str, size: usize) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / size);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % size == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
