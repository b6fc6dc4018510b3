//! SmartScript parser.
//!
//! Consumes [`Lexer`] tokens and builds a [`Document`].  Nesting is tracked
//! with an explicit stack of open container ids, seeded with the root:
//!
//! - text token: new `Text` child of the open container
//! - `FOR var start end [step]`: new `Loop` child, then pushed as open
//! - `= elements...` or a lone `=element`: new `Echo` child
//! - `END`: pop the open container
//!
//! Keywords are case-insensitive.  Loops nest at most [`MAX_NESTING`] deep.
//! Parsing is fail-fast; the first error aborts and no partial tree is
//! returned.

use thiserror::Error;
use tracing::debug;

use super::element::{split_chunks, Element};
use super::lexer::{Lexer, ScanError, Token};
use super::node::{Document, LoopNode, Node, NodeId};

/// Maximum number of loops open at once.
///
/// Rendering and the tree writer recurse once per level, so this bounds
/// their stack use.
pub const MAX_NESTING: usize = 256;

/// Error raised while parsing a template.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("unknown tag name {0:?}")]
    UnknownTag(String),
    #[error("FOR tag takes 3 or 4 arguments, found {0}")]
    ForArity(usize),
    #[error("first FOR argument must be a variable, found {0:?}")]
    ForVariable(String),
    #[error("FOR argument {0:?} must be a number, string or variable")]
    ForArgument(String),
    #[error("invalid element {0:?}")]
    InvalidElement(String),
    #[error("more closing tags than opening loop tags")]
    TooManyEnds,
    #[error("unbalanced loop/end tags: {open} loop(s) left open")]
    Unbalanced { open: usize },
    #[error("loops nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Parse template source into a document tree.
pub fn parse(src: &str) -> Result<Document, ParseError> {
    let mut parser = Parser::new();
    let mut lexer = Lexer::new(src);
    loop {
        match lexer.next_token()? {
            Token::Text(text) => parser.text(text),
            Token::Tag(body) => parser.tag(&body)?,
            Token::Eof => break,
        }
    }
    parser.finish()
}

struct Parser {
    doc: Document,
    open: Vec<NodeId>,
}

impl Parser {
    fn new() -> Self {
        Parser {
            doc: Document::new(),
            open: vec![NodeId::ROOT],
        }
    }

    fn top(&self) -> NodeId {
        self.open.last().copied().unwrap_or(NodeId::ROOT)
    }

    fn append(&mut self, node: Node) -> NodeId {
        let parent = self.top();
        // Only containers are ever pushed onto `open`.
        self.doc
            .append(parent, node)
            .unwrap_or_else(|| unreachable!("open stack holds a leaf node"))
    }

    fn text(&mut self, text: String) {
        self.append(Node::Text(text));
    }

    fn tag(&mut self, body: &str) -> Result<(), ParseError> {
        let chunks = split_chunks(body);
        let Some(name) = chunks.first() else {
            return Err(ParseError::UnknownTag(String::new()));
        };

        if name == "=" {
            self.echo(chunks[1..].iter().map(String::as_str))?;
        } else if let Some(rest) = name.strip_prefix('=').filter(|_| chunks.len() == 1) {
            self.echo([rest])?;
        } else if name.eq_ignore_ascii_case("for") {
            if self.open.len() > MAX_NESTING {
                return Err(ParseError::TooDeep { limit: MAX_NESTING });
            }
            let lp = for_loop(&chunks[1..])?;
            let id = self.append(Node::Loop(lp));
            self.open.push(id);
        } else if name.eq_ignore_ascii_case("end") && chunks.len() == 1 {
            self.open.pop();
            if self.open.is_empty() {
                return Err(ParseError::TooManyEnds);
            }
        } else {
            return Err(ParseError::UnknownTag(body.to_owned()));
        }
        Ok(())
    }

    fn echo<'a>(&mut self, chunks: impl IntoIterator<Item = &'a str>) -> Result<(), ParseError> {
        let elements = chunks.into_iter().map(element).collect::<Result<Vec<_>, _>>()?;
        self.append(Node::Echo(elements));
        Ok(())
    }

    fn finish(self) -> Result<Document, ParseError> {
        if self.open.len() != 1 {
            return Err(ParseError::Unbalanced {
                open: self.open.len().saturating_sub(1),
            });
        }
        debug!(nodes = self.doc.len(), "parsed document");
        Ok(self.doc)
    }
}

fn element(chunk: &str) -> Result<Element, ParseError> {
    Element::classify(chunk).ok_or_else(|| ParseError::InvalidElement(chunk.to_owned()))
}

fn for_loop(args: &[String]) -> Result<LoopNode, ParseError> {
    if !(3..=4).contains(&args.len()) {
        return Err(ParseError::ForArity(args.len()));
    }
    let variable = match Element::classify(&args[0]) {
        Some(Element::Variable(name)) => name,
        _ => return Err(ParseError::ForVariable(args[0].clone())),
    };
    let exprs = args[1..]
        .iter()
        .map(|chunk| match Element::classify(chunk) {
            Some(
                el @ (Element::Integer(_)
                | Element::Double(_)
                | Element::Str(_)
                | Element::Variable(_)),
            ) => Ok(el),
            _ => Err(ParseError::ForArgument(chunk.clone())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut exprs = exprs.into_iter();
    let (Some(start), Some(end)) = (exprs.next(), exprs.next()) else {
        return Err(ParseError::ForArity(args.len()));
    };
    let step = exprs.next();
    Ok(LoopNode {
        variable,
        start,
        end,
        step,
        children: Vec::new(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
