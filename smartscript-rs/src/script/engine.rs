//! Template execution.
//!
//! [`render`] walks a parsed [`Document`] depth-first in source order and
//! writes everything it produces to a [`RequestContext`]:
//!
//! - `Text` nodes are written verbatim.
//! - `Loop` nodes bind their variable on a [`MultiStack`] for the duration
//!   of the loop and run their children once per iteration.
//! - `Echo` nodes evaluate their elements as a postfix program on a fresh
//!   [`EvalStack`]; whatever is left afterwards is written bottom first.
//!
//! All state lives in a per-call renderer, so one `Document` can be shared
//! and rendered from several threads at once.

use std::cmp::Ordering;

use thiserror::Error;
use tracing::{debug, trace};

use crate::context::{ContextError, RequestContext};

use super::builtins::{self, EvalStack};
use super::decfmt::FormatError;
use super::element::Element;
use super::multistack::MultiStack;
use super::node::{Document, LoopNode, Node, NodeId};
use super::value::{Value, ValueCell, ValueError};

/// Error raised while rendering a document.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("variable {0:?} is not bound")]
    UnknownVariable(String),
    #[error("unsupported operator {0:?}")]
    UnsupportedOperator(String),
    #[error("unknown function @{0}")]
    UnknownFunction(String),
    #[error("{function} needs {needed} operand(s), stack holds {available}")]
    StackUnderflow {
        function: String,
        needed: usize,
        available: usize,
    },
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Render `doc` into `ctx`.
///
/// Output already written before an error stays written.
pub fn render(doc: &Document, ctx: &mut dyn RequestContext) -> Result<(), RuntimeError> {
    let mut renderer = Renderer {
        doc,
        ctx,
        vars: MultiStack::new(),
    };
    renderer.visit(doc.root())
}

struct Renderer<'d, 'c> {
    doc: &'d Document,
    ctx: &'c mut dyn RequestContext,
    vars: MultiStack,
}

impl<'d, 'c> Renderer<'d, 'c> {
    fn visit(&mut self, id: NodeId) -> Result<(), RuntimeError> {
        let doc = self.doc;
        match doc.node(id) {
            Node::Document { children } => self.visit_all(children),
            Node::Text(text) => Ok(self.ctx.write(text)?),
            Node::Echo(elements) => self.echo(elements),
            Node::Loop(lp) => self.run_loop(lp),
        }
    }

    fn visit_all(&mut self, children: &[NodeId]) -> Result<(), RuntimeError> {
        for &child in children {
            self.visit(child)?;
        }
        Ok(())
    }

    // ── Loops ─────────────────────────────────────────────────────────────────

    fn run_loop(&mut self, lp: &LoopNode) -> Result<(), RuntimeError> {
        let start = self.resolve(&lp.start)?;
        let end = self.resolve(&lp.end)?;
        let step = match &lp.step {
            Some(el) => self.resolve(el)?,
            None => Value::Int(1),
        };

        self.vars.push(&lp.variable, ValueCell::new(Some(&start))?);
        let result = self.iterate(lp, &end, &step);
        self.vars.pop(&lp.variable);

        let iterations = result?;
        debug!(variable = %lp.variable, iterations, "loop finished");
        Ok(())
    }

    fn iterate(&mut self, lp: &LoopNode, end: &Value, step: &Value) -> Result<usize, RuntimeError> {
        let mut iterations = 0usize;
        loop {
            let current = self.binding(&lp.variable)?;
            if current.num_compare(Some(end))? == Ordering::Greater {
                return Ok(iterations);
            }
            trace!(variable = %lp.variable, value = %current.get_value(), "loop iteration");
            self.visit_all(&lp.children)?;
            self.binding_mut(&lp.variable)?.increment(Some(step))?;
            iterations += 1;
        }
    }

    // ── Echo ──────────────────────────────────────────────────────────────────

    fn echo(&mut self, elements: &[Element]) -> Result<(), RuntimeError> {
        let mut stack = EvalStack::new();
        for el in elements {
            match el {
                Element::Integer(_) | Element::Double(_) | Element::Str(_) => {
                    stack.push(self.resolve(el)?);
                }
                Element::Variable(name) => stack.push(self.binding(name)?.get_value()),
                Element::Operator(op) => builtins::apply_operator(&mut stack, *op)?,
                Element::Function(name) => {
                    builtins::call_builtin(name, &mut stack, &mut *self.ctx)
                        .ok_or_else(|| RuntimeError::UnknownFunction(name.clone()))??;
                }
            }
        }
        let values = stack.into_values();
        trace!(values = values.len(), "echo flush");
        for value in values {
            self.ctx.write(&value.to_string())?;
        }
        Ok(())
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Value of a constant or variable element.
    fn resolve(&self, el: &Element) -> Result<Value, RuntimeError> {
        match el {
            Element::Variable(name) => Ok(self.binding(name)?.get_value()),
            Element::Function(name) => Err(RuntimeError::UnknownFunction(name.clone())),
            Element::Operator(op) => Err(RuntimeError::UnsupportedOperator(op.symbol().to_owned())),
            _ => el
                .constant()
                .ok_or_else(|| RuntimeError::UnsupportedOperator(el.as_text())),
        }
    }

    fn binding(&self, name: &str) -> Result<&ValueCell, RuntimeError> {
        self.vars
            .peek(name)
            .ok_or_else(|| RuntimeError::UnknownVariable(name.to_owned()))
    }

    fn binding_mut(&mut self, name: &str) -> Result<&mut ValueCell, RuntimeError> {
        self.vars
            .peek_mut(name)
            .ok_or_else(|| RuntimeError::UnknownVariable(name.to_owned()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
