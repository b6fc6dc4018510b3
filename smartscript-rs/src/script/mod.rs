//! SmartScript template language.
//!
//! A template is plain text with embedded tags delimited by `{$` and `$}`:
//!
//! - `{$= e1 e2 ... $}` evaluates its elements as a postfix program and
//!   writes what is left on the stack
//! - `{$ FOR var start end [step] $} ... {$END$}` repeats its body
//!
//! Processing happens in three stages:
//!
//! 1. [`lexer`] splits the source into text and tag tokens
//! 2. [`parser`] builds an immutable [`Document`] tree
//! 3. [`engine`] renders the tree into a [`RequestContext`]
//!
//! # Quick start
//!
//! ```rust
//! use smartscript::context::CaptureContext;
//! use smartscript::script::{parse, render};
//!
//! let doc = parse("{$ FOR i 1 3 $}{$= i i * $} {$END$}").unwrap();
//! let mut ctx = CaptureContext::new();
//! render(&doc, &mut ctx).unwrap();
//! assert_eq!(ctx.output, "1 4 9 ");
//! ```
//!
//! [`RequestContext`]: crate::context::RequestContext

pub mod builtins;
pub mod decfmt;
pub mod element;
pub mod engine;
pub mod lexer;
pub mod multistack;
pub mod node;
pub mod parser;
pub mod value;
pub mod writer;

// Re-exports for convenience.
pub use element::Element;
pub use engine::{render, RuntimeError};
pub use node::{Document, Node, NodeId};
pub use parser::{parse, ParseError};
pub use value::Value;
pub use writer::write_tree;

use crate::context::RequestContext;
use crate::error::Error;

/// Parse `src` and render it into `ctx` in one step.
pub fn render_str(src: &str, ctx: &mut dyn RequestContext) -> Result<(), Error> {
    let doc = parse(src)?;
    render(&doc, ctx)?;
    Ok(())
}
