//! `smartscriptrc` configuration file parser.
//!
//! One directive per line; blank lines and lines starting with `;` are
//! ignored.  Values may be double-quoted to keep spaces.
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `param <name>=<value>` | add a request parameter |
//! | `pparam <name>=<value>` | add a persistent parameter |
//! | `mime <type>` | response MIME type |
//! | `encoding <name>` | response encoding (`UTF-8` or `ISO-8859-1`) |
//! | `status <code> [<text>...]` | response status line |
//! | `header on\|off` | prefix output with a response header |
//! | `cookie <name>=<value> [domain=<d>] [path=<p>] [max-age=<n>]` | add an output cookie |
//!
//! Bad lines never abort loading; they are returned as [`ConfigError`]s next
//! to whatever was parsed successfully.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;
use tracing::warn;

use crate::context::{ContextError, Cookie, Encoding, RequestContext, ResponseContext};

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Settings applied to every response the binary produces.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Config {
    pub parameters: HashMap<String, String>,
    pub persistent: HashMap<String, String>,
    pub mime_type: Option<String>,
    pub encoding: Option<String>,
    pub status_code: Option<u16>,
    pub status_text: Option<String>,
    pub header: bool,
    pub cookies: Vec<Cookie>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Returns the config and a list of any errors on individual lines.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let (directive, rest) = line
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((line, ""));
            let tokens = split_args(rest.trim());

            if let Err(message) = config.apply_directive(directive, &tokens) {
                warn!(line = i + 1, error = %message, "ignoring config line");
                errors.push(ConfigError { line: i + 1, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    fn apply_directive(&mut self, directive: &str, tokens: &[String]) -> Result<(), String> {
        match directive {
            "param" => {
                let (name, value) = single_pair(directive, tokens)?;
                self.parameters.insert(name, value);
            }
            "pparam" => {
                let (name, value) = single_pair(directive, tokens)?;
                self.persistent.insert(name, value);
            }
            "mime" => self.mime_type = Some(single(directive, tokens)?),
            "encoding" => {
                let name = single(directive, tokens)?;
                if Encoding::from_name(&name).is_none() {
                    return Err(format!("unsupported encoding: {name}"));
                }
                self.encoding = Some(name);
            }
            "status" => {
                let (code, text) = tokens
                    .split_first()
                    .ok_or_else(|| "status requires a code".to_owned())?;
                let code: u16 = code
                    .parse()
                    .map_err(|_| format!("invalid status code: {code}"))?;
                self.status_code = Some(code);
                if !text.is_empty() {
                    self.status_text = Some(text.join(" "));
                }
            }
            "header" => {
                self.header = match single(directive, tokens)?.as_str() {
                    "on" => true,
                    "off" => false,
                    other => return Err(format!("header must be on or off, not {other:?}")),
                };
            }
            "cookie" => self.cookies.push(parse_cookie(tokens)?),
            other => return Err(format!("unknown directive: {other}")),
        }
        Ok(())
    }

    /// Build a response context over `sink` carrying these settings.
    pub fn response<W: Write>(&self, sink: W) -> Result<ResponseContext<W>, ContextError> {
        let mut ctx = ResponseContext::new(sink)
            .with_parameters(self.parameters.clone())
            .with_persistent_parameters(self.persistent.clone())
            .with_header(self.header);
        if let Some(mime) = &self.mime_type {
            ctx.set_mime_type(mime)?;
        }
        if let Some(encoding) = &self.encoding {
            ctx.set_encoding(encoding)?;
        }
        if let Some(code) = self.status_code {
            ctx.set_status_code(code)?;
        }
        if let Some(text) = &self.status_text {
            ctx.set_status_text(text)?;
        }
        for cookie in &self.cookies {
            ctx.add_cookie(cookie.clone())?;
        }
        Ok(ctx)
    }
}

// ── Search path ───────────────────────────────────────────────────────────────

/// Search for the user config file in the standard locations.
///
/// Order: `$SMARTSCRIPT_RC`, `<config dir>/smartscript/smartscriptrc`,
/// `./.smartscriptrc`.  Returns the first path that exists.
pub fn find_user_config() -> Option<PathBuf> {
    let from_env = std::env::var_os("SMARTSCRIPT_RC").map(PathBuf::from);
    let from_dirs =
        BaseDirs::new().map(|d| d.config_dir().join("smartscript").join("smartscriptrc"));
    from_env
        .into_iter()
        .chain(from_dirs)
        .chain(std::iter::once(PathBuf::from("./.smartscriptrc")))
        .find(|p| p.is_file())
}

// ── Argument helpers ──────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() {
                    args.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        args.push(cur);
    }
    args
}

fn single(directive: &str, tokens: &[String]) -> Result<String, String> {
    match tokens {
        [value] => Ok(value.clone()),
        _ => Err(format!("{directive} takes exactly one argument")),
    }
}

/// Split `name=value`; the name must be non-empty.
pub(crate) fn split_pair(token: &str) -> Option<(String, String)> {
    match token.split_once('=') {
        Some((name, value)) if !name.is_empty() => Some((name.to_owned(), value.to_owned())),
        _ => None,
    }
}

fn single_pair(directive: &str, tokens: &[String]) -> Result<(String, String), String> {
    let token = single(directive, tokens)?;
    split_pair(&token).ok_or_else(|| format!("{directive} expects name=value, got {token:?}"))
}

fn parse_cookie(tokens: &[String]) -> Result<Cookie, String> {
    let (first, attrs) = tokens
        .split_first()
        .ok_or_else(|| "cookie requires name=value".to_owned())?;
    let (name, value) =
        split_pair(first).ok_or_else(|| format!("cookie expects name=value, got {first:?}"))?;
    let mut cookie = Cookie::new(name, value);
    for attr in attrs {
        let (key, val) = split_pair(attr).ok_or_else(|| format!("bad cookie attribute: {attr}"))?;
        match key.to_ascii_lowercase().as_str() {
            "domain" => cookie.domain = Some(val),
            "path" => cookie.path = Some(val),
            "max-age" => {
                let age = val.parse().map_err(|_| format!("invalid max-age: {val}"))?;
                cookie.max_age = Some(age);
            }
            _ => return Err(format!("unknown cookie attribute: {key}")),
        }
    }
    Ok(cookie)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // -- split_args -----------------------------------------------------------

    #[test]
    fn split_simple() {
        assert_eq!(split_args("foo bar baz"), ["foo", "bar", "baz"]);
    }

    #[test]
    fn split_quoted_value() {
        assert_eq!(split_args(r#"greeting="hello world""#), ["greeting=hello world"]);
    }

    #[test]
    fn split_escaped_quote_inside_quotes() {
        assert_eq!(split_args(r#""say \"hi\"""#), [r#"say "hi""#]);
    }

    // -- directives -----------------------------------------------------------

    #[test]
    fn parameters() {
        let (cfg, errs) = Config::load_str("param a=1\npparam visits=10\nparam b=\"x y\"");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.parameters.get("a").map(String::as_str), Some("1"));
        assert_eq!(cfg.parameters.get("b").map(String::as_str), Some("x y"));
        assert_eq!(cfg.persistent.get("visits").map(String::as_str), Some("10"));
    }

    #[test]
    fn empty_value_is_allowed() {
        let (cfg, errs) = Config::load_str("param a=");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.parameters.get("a").map(String::as_str), Some(""));
    }

    #[test]
    fn response_properties() {
        let (cfg, errs) = Config::load_str(
            "mime text/plain\nencoding ISO-8859-1\nstatus 404 Not Found\nheader on",
        );
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(cfg.encoding.as_deref(), Some("ISO-8859-1"));
        assert_eq!(cfg.status_code, Some(404));
        assert_eq!(cfg.status_text.as_deref(), Some("Not Found"));
        assert!(cfg.header);
    }

    #[test]
    fn cookies() {
        let (cfg, errs) =
            Config::load_str("cookie sid=abc domain=example.com path=/ max-age=60\ncookie x=1");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.cookies.len(), 2);
        let c = &cfg.cookies[0];
        assert_eq!((c.name.as_str(), c.value.as_str()), ("sid", "abc"));
        assert_eq!(c.domain.as_deref(), Some("example.com"));
        assert_eq!(c.path.as_deref(), Some("/"));
        assert_eq!(c.max_age, Some(60));
        assert!(cfg.cookies[1].domain.is_none());
    }

    #[test]
    fn comments_and_blanks_ignored() {
        let (cfg, errs) = Config::load_str("; comment\n\n   ;; another\nparam a=1\n");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.parameters.len(), 1);
    }

    #[test]
    fn bad_lines_are_reported_with_line_numbers() {
        let src = "param a=1\nparam nope\nfrobnicate\nstatus abc\n\
                   header maybe\nencoding EBCDIC\ncookie x=1 secure";
        let (cfg, errs) = Config::load_str(src);
        let lines: Vec<usize> = errs.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(cfg.parameters.len(), 1);
        assert!(errs[1].to_string().starts_with("line 3: unknown directive"));
    }

    #[test]
    fn response_context_carries_settings() {
        let (cfg, _) =
            Config::load_str("mime text/plain\nstatus 201 Created\nheader on\nparam p=v");
        let mut ctx = cfg.response(Vec::new()).unwrap();
        assert_eq!(ctx.parameter("p"), Some("v"));
        ctx.write("hi").unwrap();
        let (out, _) = ctx.into_parts();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with(
            "HTTP/1.1 201 Created\r\nContent-Type: text/plain; charset=UTF-8\r\n"
        ));
        assert!(out.ends_with("\r\n\r\nhi"));
    }

    #[test]
    fn load_file_reads_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "param a=1").unwrap();
        let (cfg, errs) = Config::load_file(file.path()).unwrap();
        assert!(errs.is_empty());
        assert_eq!(cfg.parameters.get("a").map(String::as_str), Some("1"));
        assert!(Config::load_file(Path::new("/nonexistent/smartscriptrc")).is_err());
    }
}
