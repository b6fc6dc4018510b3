//! Request context: the boundary between a render and whatever serves it.
//!
//! The engine only needs [`RequestContext`]: an output sink plus scoped
//! parameter maps and a MIME type setter.  Two implementations live here:
//!
//! - [`ResponseContext`] writes to any [`Write`] sink and can prefix the body
//!   with an HTTP-style response header (status line, content type, cookies)
//!   generated on the first write.
//! - [`CaptureContext`] keeps everything in memory; handy for tests and for
//!   embedding the engine.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{self, Write};

use thiserror::Error;

/// Error raised by a request context.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("cannot change {0} after the header was generated")]
    HeaderGenerated(&'static str),
    #[error("unsupported encoding {0:?}")]
    UnsupportedEncoding(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What a render needs from its environment.
pub trait RequestContext {
    /// Append `text` to the response body.
    fn write(&mut self, text: &str) -> Result<(), ContextError>;

    /// Request parameter (read-only).
    fn parameter(&self, name: &str) -> Option<&str>;

    fn persistent_parameter(&self, name: &str) -> Option<&str>;
    fn set_persistent_parameter(&mut self, name: &str, value: &str);
    fn remove_persistent_parameter(&mut self, name: &str);

    fn temporary_parameter(&self, name: &str) -> Option<&str>;
    fn set_temporary_parameter(&mut self, name: &str, value: &str);
    fn remove_temporary_parameter(&mut self, name: &str);

    /// Declare the content type of the eventual response.
    fn set_mime_type(&mut self, mime_type: &str) -> Result<(), ContextError>;
}

// ── Cookies & encodings ───────────────────────────────────────────────────────

/// An outgoing cookie, rendered as a `Set-Cookie` header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub max_age: Option<u32>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Cookie {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            max_age: None,
        }
    }
}

/// Body encodings a [`ResponseContext`] can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

impl Encoding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Some(Encoding::Utf8),
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => Some(Encoding::Latin1),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Latin1 => "ISO-8859-1",
        }
    }

    /// Encode `text`; characters outside Latin-1 become `?`.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }
}

// ── ResponseContext ───────────────────────────────────────────────────────────

/// A [`RequestContext`] writing to a byte sink.
#[derive(Debug)]
pub struct ResponseContext<W: Write> {
    sink: W,
    encoding: Encoding,
    status_code: u16,
    status_text: String,
    mime_type: String,
    content_length: Option<u64>,
    emit_header: bool,
    header_generated: bool,

    parameters: HashMap<String, String>,
    persistent: HashMap<String, String>,
    temporary: HashMap<String, String>,
    cookies: Vec<Cookie>,
}

impl<W: Write> ResponseContext<W> {
    pub fn new(sink: W) -> Self {
        ResponseContext {
            sink,
            encoding: Encoding::Utf8,
            status_code: 200,
            status_text: "OK".to_owned(),
            mime_type: "text/html".to_owned(),
            content_length: None,
            emit_header: true,
            header_generated: false,
            parameters: HashMap::new(),
            persistent: HashMap::new(),
            temporary: HashMap::new(),
            cookies: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: HashMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_persistent_parameters(mut self, persistent: HashMap<String, String>) -> Self {
        self.persistent = persistent;
        self
    }

    /// Whether the first write is preceded by a response header.
    pub fn with_header(mut self, emit_header: bool) -> Self {
        self.emit_header = emit_header;
        self
    }

    fn ensure_open(&self, what: &'static str) -> Result<(), ContextError> {
        if self.header_generated {
            Err(ContextError::HeaderGenerated(what))
        } else {
            Ok(())
        }
    }

    pub fn set_encoding(&mut self, name: &str) -> Result<(), ContextError> {
        self.ensure_open("encoding")?;
        self.encoding = Encoding::from_name(name)
            .ok_or_else(|| ContextError::UnsupportedEncoding(name.to_owned()))?;
        Ok(())
    }

    pub fn set_status_code(&mut self, code: u16) -> Result<(), ContextError> {
        self.ensure_open("status code")?;
        self.status_code = code;
        Ok(())
    }

    pub fn set_status_text(&mut self, text: &str) -> Result<(), ContextError> {
        self.ensure_open("status text")?;
        self.status_text = text.to_owned();
        Ok(())
    }

    pub fn set_content_length(&mut self, length: u64) -> Result<(), ContextError> {
        self.ensure_open("content length")?;
        self.content_length = Some(length);
        Ok(())
    }

    pub fn add_cookie(&mut self, cookie: Cookie) -> Result<(), ContextError> {
        self.ensure_open("cookies")?;
        self.cookies.push(cookie);
        Ok(())
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn persistent_parameters(&self) -> &HashMap<String, String> {
        &self.persistent
    }

    pub fn temporary_parameters(&self) -> &HashMap<String, String> {
        &self.temporary
    }

    pub fn header_generated(&self) -> bool {
        self.header_generated
    }

    /// Give back the sink and the persistent parameters, which outlive a
    /// single response.
    pub fn into_parts(self) -> (W, HashMap<String, String>) {
        (self.sink, self.persistent)
    }

    fn header(&self) -> String {
        let mut h = String::new();
        let _ = write!(h, "HTTP/1.1 {} {}\r\n", self.status_code, self.status_text);
        let _ = write!(h, "Content-Type: {}", self.mime_type);
        if self.mime_type.starts_with("text/") {
            let _ = write!(h, "; charset={}", self.encoding.name());
        }
        h.push_str("\r\n");
        if let Some(len) = self.content_length {
            let _ = write!(h, "Content-Length: {len}\r\n");
        }
        for c in &self.cookies {
            let _ = write!(h, "Set-Cookie: {}={}", c.name, c.value);
            if let Some(domain) = &c.domain {
                let _ = write!(h, "; Domain={domain}");
            }
            if let Some(path) = &c.path {
                let _ = write!(h, "; Path={path}");
            }
            if let Some(age) = c.max_age {
                let _ = write!(h, "; Max-Age={age}");
            }
            h.push_str("\r\n");
        }
        h.push_str("\r\n");
        h
    }

    /// Write raw bytes to the body, generating the header first if needed.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), ContextError> {
        if !self.header_generated {
            if self.emit_header {
                let header = self.header();
                self.sink.write_all(&Encoding::Latin1.encode(&header))?;
            }
            self.header_generated = true;
        }
        self.sink.write_all(data)?;
        self.sink.flush()?;
        Ok(())
    }
}

impl<W: Write> RequestContext for ResponseContext<W> {
    fn write(&mut self, text: &str) -> Result<(), ContextError> {
        let data = self.encoding.encode(text);
        self.write_bytes(&data)
    }

    fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    fn persistent_parameter(&self, name: &str) -> Option<&str> {
        self.persistent.get(name).map(String::as_str)
    }

    fn set_persistent_parameter(&mut self, name: &str, value: &str) {
        self.persistent.insert(name.to_owned(), value.to_owned());
    }

    fn remove_persistent_parameter(&mut self, name: &str) {
        self.persistent.remove(name);
    }

    fn temporary_parameter(&self, name: &str) -> Option<&str> {
        self.temporary.get(name).map(String::as_str)
    }

    fn set_temporary_parameter(&mut self, name: &str, value: &str) {
        self.temporary.insert(name.to_owned(), value.to_owned());
    }

    fn remove_temporary_parameter(&mut self, name: &str) {
        self.temporary.remove(name);
    }

    fn set_mime_type(&mut self, mime_type: &str) -> Result<(), ContextError> {
        self.ensure_open("mime type")?;
        self.mime_type = mime_type.to_owned();
        Ok(())
    }
}

// ── CaptureContext ────────────────────────────────────────────────────────────

/// In-memory context: output accumulates in [`CaptureContext::output`].
#[derive(Debug, Default, Clone)]
pub struct CaptureContext {
    pub output: String,
    pub mime_type: Option<String>,
    pub parameters: HashMap<String, String>,
    pub persistent: HashMap<String, String>,
    pub temporary: HashMap<String, String>,
}

impl CaptureContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.parameters.insert(name.to_owned(), value.to_owned());
        self
    }

    pub fn with_persistent(mut self, name: &str, value: &str) -> Self {
        self.persistent.insert(name.to_owned(), value.to_owned());
        self
    }
}

impl RequestContext for CaptureContext {
    fn write(&mut self, text: &str) -> Result<(), ContextError> {
        self.output.push_str(text);
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    fn persistent_parameter(&self, name: &str) -> Option<&str> {
        self.persistent.get(name).map(String::as_str)
    }

    fn set_persistent_parameter(&mut self, name: &str, value: &str) {
        self.persistent.insert(name.to_owned(), value.to_owned());
    }

    fn remove_persistent_parameter(&mut self, name: &str) {
        self.persistent.remove(name);
    }

    fn temporary_parameter(&self, name: &str) -> Option<&str> {
        self.temporary.get(name).map(String::as_str)
    }

    fn set_temporary_parameter(&mut self, name: &str, value: &str) {
        self.temporary.insert(name.to_owned(), value.to_owned());
    }

    fn remove_temporary_parameter(&mut self, name: &str) {
        self.temporary.remove(name);
    }

    fn set_mime_type(&mut self, mime_type: &str) -> Result<(), ContextError> {
        self.mime_type = Some(mime_type.to_owned());
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body(ctx: ResponseContext<Vec<u8>>) -> String {
        String::from_utf8(ctx.into_parts().0).unwrap()
    }

    #[test]
    fn default_header() {
        let mut ctx = ResponseContext::new(Vec::new());
        ctx.write("hi").unwrap();
        assert_eq!(
            body(ctx),
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=UTF-8\r\n\r\nhi"
        );
    }

    #[test]
    fn header_with_cookies_and_length() {
        let mut ctx = ResponseContext::new(Vec::new());
        ctx.set_status_code(404).unwrap();
        ctx.set_status_text("Not Found").unwrap();
        ctx.set_mime_type("application/json").unwrap();
        ctx.set_content_length(2).unwrap();
        ctx.add_cookie(Cookie {
            domain: Some("127.0.0.1".into()),
            path: Some("/".into()),
            max_age: Some(3600),
            ..Cookie::new("korisnik", "perica")
        })
        .unwrap();
        ctx.add_cookie(Cookie::new("zemlja", "Hrvatska")).unwrap();
        ctx.write("{}").unwrap();
        assert_eq!(
            body(ctx),
            "HTTP/1.1 404 Not Found\r\n\
             Content-Type: application/json\r\n\
             Content-Length: 2\r\n\
             Set-Cookie: korisnik=perica; Domain=127.0.0.1; Path=/; Max-Age=3600\r\n\
             Set-Cookie: zemlja=Hrvatska\r\n\
             \r\n{}"
        );
    }

    #[test]
    fn header_written_once() {
        let mut ctx = ResponseContext::new(Vec::new()).with_header(true);
        ctx.write("a").unwrap();
        ctx.write("b").unwrap();
        assert!(body(ctx).ends_with("\r\n\r\nab"));
    }

    #[test]
    fn setters_fail_after_first_write() {
        let mut ctx = ResponseContext::new(Vec::new());
        ctx.write("x").unwrap();
        assert!(ctx.header_generated());
        assert!(matches!(
            ctx.set_mime_type("text/plain"),
            Err(ContextError::HeaderGenerated("mime type"))
        ));
        assert!(ctx.set_status_code(500).is_err());
        assert!(ctx.set_encoding("UTF-8").is_err());
        assert!(ctx.add_cookie(Cookie::new("a", "b")).is_err());
    }

    #[test]
    fn headerless_output() {
        let mut ctx = ResponseContext::new(Vec::new()).with_header(false);
        ctx.write("only body").unwrap();
        assert_eq!(body(ctx), "only body");
    }

    #[test]
    fn latin1_encoding() {
        let mut ctx = ResponseContext::new(Vec::new()).with_header(false);
        ctx.set_encoding("iso-8859-1").unwrap();
        ctx.write("čé€").unwrap();
        let (bytes, _) = ctx.into_parts();
        assert_eq!(bytes, vec![b'?', 0xE9, b'?']);
    }

    #[test]
    fn unknown_encoding() {
        let mut ctx = ResponseContext::new(Vec::new());
        assert!(matches!(
            ctx.set_encoding("EBCDIC"),
            Err(ContextError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn parameter_scopes() {
        let mut params = HashMap::new();
        params.insert("a".to_owned(), "1".to_owned());
        let mut ctx = ResponseContext::new(Vec::new()).with_parameters(params);
        assert_eq!(ctx.parameter("a"), Some("1"));
        assert_eq!(ctx.parameter("b"), None);
        assert_eq!(ctx.parameter_names().collect::<Vec<_>>(), vec!["a"]);

        ctx.set_persistent_parameter("visits", "3");
        ctx.set_temporary_parameter("t", "x");
        assert_eq!(ctx.persistent_parameter("visits"), Some("3"));
        assert_eq!(ctx.temporary_parameter("t"), Some("x"));
        ctx.remove_temporary_parameter("t");
        assert_eq!(ctx.temporary_parameter("t"), None);
        assert!(ctx.temporary_parameters().is_empty());

        let (_, persistent) = ctx.into_parts();
        assert_eq!(persistent.get("visits").map(String::as_str), Some("3"));
    }

    #[test]
    fn capture_context() {
        let mut ctx = CaptureContext::new().with_parameter("p", "v");
        ctx.write("a").unwrap();
        ctx.write("b").unwrap();
        ctx.set_mime_type("text/plain").unwrap();
        ctx.set_persistent_parameter("k", "v");
        ctx.remove_persistent_parameter("k");
        assert_eq!(ctx.output, "ab");
        assert_eq!(ctx.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(ctx.parameter("p"), Some("v"));
        assert!(ctx.persistent.is_empty());
    }
}
