//! SmartScript scanner.
//!
//! Splits template source into literal text runs and raw tag bodies.  The
//! scanner is a small state machine:
//!
//! | State  | Input        | Action                                        |
//! |--------|--------------|-----------------------------------------------|
//! | `Text` | `{$`         | flush text, enter `Tag`                       |
//! | `Text` | `\{`         | literal `{`                                   |
//! | `Text` | `\\`         | literal `\`                                   |
//! | `Text` | `\` + other  | [`ScanError::UnsupportedEscape`]              |
//! | `Tag`  | `$}`         | flush trimmed tag body, enter `Text`          |
//!
//! A delimiter split across a line break (`{` + whitespace with a newline +
//! `$`, or the same shape for `$}`) is folded into the delimiter, so tags
//! may be written with their braces on separate lines.

use thiserror::Error;

/// Error raised while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unsupported escape sequence '\\{ch}' at offset {offset}")]
    UnsupportedEscape { offset: usize, ch: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text with escapes resolved.
    Text(String),
    /// Trimmed contents between `{$` and `$}`.
    Tag(String),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerState {
    Init,
    Text,
    Tag,
}

pub struct Lexer {
    src: Vec<char>,
    pos: usize,
    state: LexerState,
    buffer: String,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        Lexer {
            src: src.chars().collect(),
            pos: 0,
            state: LexerState::Init,
            buffer: String::new(),
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset).copied()
    }

    /// Length of the delimiter `open` + `close` starting at the cursor, if
    /// present.  Whitespace between the two characters is accepted only when
    /// it contains a line break.
    fn delimiter(&self, open: char, close: char) -> Option<usize> {
        if self.peek_at(0) != Some(open) {
            return None;
        }
        let mut len = 1;
        let mut saw_newline = false;
        while let Some(c) = self.peek_at(len) {
            match c {
                '\n' | '\r' => saw_newline = true,
                ' ' | '\t' => {}
                _ => break,
            }
            len += 1;
        }
        match self.peek_at(len) {
            Some(c) if c == close && (len == 1 || saw_newline) => Some(len + 1),
            _ => None,
        }
    }

    fn flush(&mut self) -> Token {
        let data = std::mem::take(&mut self.buffer);
        match self.state {
            LexerState::Tag => Token::Tag(data.trim().to_owned()),
            LexerState::Text | LexerState::Init => Token::Text(data),
        }
    }

    /// Produce the next token.  Returns [`Token::Eof`] once input is exhausted,
    /// and keeps returning it on further calls.
    pub fn next_token(&mut self) -> Result<Token, ScanError> {
        while self.pos < self.src.len() {
            match self.state {
                LexerState::Init => match self.delimiter('{', '$') {
                    Some(len) => {
                        self.state = LexerState::Tag;
                        self.pos += len;
                    }
                    None => self.state = LexerState::Text,
                },
                LexerState::Text => {
                    if let Some(len) = self.delimiter('{', '$') {
                        if !self.buffer.is_empty() {
                            return Ok(self.flush());
                        }
                        self.state = LexerState::Tag;
                        self.pos += len;
                        continue;
                    }
                    let ch = self.src[self.pos];
                    if ch == '\\' {
                        match self.peek_at(1) {
                            Some(next @ ('{' | '\\')) => {
                                self.buffer.push(next);
                                self.pos += 2;
                            }
                            other => {
                                return Err(ScanError::UnsupportedEscape {
                                    offset: self.pos,
                                    ch: other.map(String::from).unwrap_or_default(),
                                });
                            }
                        }
                    } else {
                        self.buffer.push(ch);
                        self.pos += 1;
                    }
                }
                LexerState::Tag => {
                    if let Some(len) = self.delimiter('$', '}') {
                        if !self.buffer.is_empty() {
                            return Ok(self.flush());
                        }
                        self.state = LexerState::Text;
                        self.pos += len;
                        continue;
                    }
                    self.buffer.push(self.src[self.pos]);
                    self.pos += 1;
                }
            }
        }

        if self.buffer.is_empty() {
            Ok(Token::Eof)
        } else {
            Ok(self.flush())
        }
    }

    /// Scan the whole input, ending with a single [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, ScanError> {
        let mut tokens = Vec::new();
        loop {
            let t = self.next_token()?;
            let done = t == Token::Eof;
            tokens.push(t);
            if done {
                break;
            }
        }
        Ok(tokens)
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(Token::Eof) => None,
            other => Some(other),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
