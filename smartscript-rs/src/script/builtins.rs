//! Built-in stack functions.
//!
//! Each built-in pops its own operands from the echo evaluation stack and
//! pushes its own results.  The table is a process-wide static; functions
//! that need the request context are tagged [`Builtin::Context`].
//!
//! | Name          | Stack effect (top on the right)     |
//! |---------------|-------------------------------------|
//! | `sin`         | `deg` → `sin(deg)`                  |
//! | `decfmt`      | `x pattern` → `formatted`           |
//! | `dup`         | `a` → `a a`                         |
//! | `swap`        | `a b` → `b a`                       |
//! | `setMimeType` | `mime` →                            |
//! | `paramGet`    | `name default` → `value`            |
//! | `pparamGet`   | `name default` → `value`            |
//! | `tparamGet`   | `name default` → `value`            |
//! | `pparamSet`   | `name value` →                      |
//! | `tparamSet`   | `name value` →                      |
//! | `pparamDel`   | `name` →                            |
//! | `tparamDel`   | `name` →                            |

use crate::context::RequestContext;

use super::decfmt;
use super::element::Operator;
use super::engine::RuntimeError;
use super::value::{Value, ValueCell, ValueError};

// ── Evaluation stack ──────────────────────────────────────────────────────────

/// Transient operand stack used while evaluating one echo tag.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EvalStack {
    items: Vec<Value>,
}

impl EvalStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    fn underflow(&self, function: &str, needed: usize) -> RuntimeError {
        RuntimeError::StackUnderflow {
            function: function.to_owned(),
            needed,
            available: self.items.len(),
        }
    }

    /// Pop the top `N` values, returned in push order (the top is last).
    pub fn pop_args<const N: usize>(&mut self, function: &str) -> Result<[Value; N], RuntimeError> {
        if self.items.len() < N {
            return Err(self.underflow(function, N));
        }
        let tail = self.items.split_off(self.items.len() - N);
        <[Value; N]>::try_from(tail).map_err(|_| self.underflow(function, N))
    }

    pub fn peek(&self, function: &str) -> Result<&Value, RuntimeError> {
        self.items.last().ok_or_else(|| self.underflow(function, 1))
    }

    /// Remaining values, bottom first.
    pub fn into_values(self) -> Vec<Value> {
        self.items
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

pub type StackFn = fn(&mut EvalStack) -> Result<(), RuntimeError>;
pub type ContextFn = fn(&mut EvalStack, &mut dyn RequestContext) -> Result<(), RuntimeError>;

#[derive(Clone, Copy)]
pub enum Builtin {
    Stack(StackFn),
    Context(ContextFn),
}

static BUILTINS: &[(&str, Builtin)] = &[
    ("sin", Builtin::Stack(sin)),
    ("decfmt", Builtin::Stack(decfmt)),
    ("dup", Builtin::Stack(dup)),
    ("swap", Builtin::Stack(swap)),
    ("setMimeType", Builtin::Context(set_mime_type)),
    ("paramGet", Builtin::Context(param_get)),
    ("pparamGet", Builtin::Context(pparam_get)),
    ("tparamGet", Builtin::Context(tparam_get)),
    ("pparamSet", Builtin::Context(pparam_set)),
    ("tparamSet", Builtin::Context(tparam_set)),
    ("pparamDel", Builtin::Context(pparam_del)),
    ("tparamDel", Builtin::Context(tparam_del)),
];

pub fn lookup(name: &str) -> Option<Builtin> {
    BUILTINS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, builtin)| builtin)
}

/// Invoke the built-in called `name`.
///
/// Returns `None` if there is no such built-in.
pub fn call_builtin(
    name: &str,
    stack: &mut EvalStack,
    ctx: &mut dyn RequestContext,
) -> Option<Result<(), RuntimeError>> {
    Some(match lookup(name)? {
        Builtin::Stack(f) => f(stack),
        Builtin::Context(f) => f(stack, ctx),
    })
}

/// Apply an arithmetic operator: pops the right operand, then the left one,
/// and pushes the narrowed result.
pub fn apply_operator(stack: &mut EvalStack, op: Operator) -> Result<(), RuntimeError> {
    let apply: fn(&mut ValueCell, Option<&Value>) -> Result<(), ValueError> = match op {
        Operator::Add => ValueCell::increment,
        Operator::Sub => ValueCell::decrement,
        Operator::Mul => ValueCell::multiply,
        Operator::Div => ValueCell::divide,
        Operator::Pow => return Err(RuntimeError::UnsupportedOperator(op.symbol().to_owned())),
    };
    let [lhs, rhs] = stack.pop_args::<2>(op.symbol())?;
    let mut cell = ValueCell::new(Some(&lhs))?;
    apply(&mut cell, Some(&rhs))?;
    stack.push(cell.get_value());
    Ok(())
}

// ── Stack functions ───────────────────────────────────────────────────────────

fn sin(stack: &mut EvalStack) -> Result<(), RuntimeError> {
    let [degrees] = stack.pop_args::<1>("sin")?;
    stack.push(Value::Double(degrees.to_number()?.to_radians().sin()));
    Ok(())
}

fn decfmt(stack: &mut EvalStack) -> Result<(), RuntimeError> {
    let [number, pattern] = stack.pop_args::<2>("decfmt")?;
    let formatted = decfmt::format(&pattern.to_string(), number.to_number()?)?;
    stack.push(Value::Str(formatted));
    Ok(())
}

fn dup(stack: &mut EvalStack) -> Result<(), RuntimeError> {
    let top = stack.peek("dup")?.clone();
    stack.push(top);
    Ok(())
}

fn swap(stack: &mut EvalStack) -> Result<(), RuntimeError> {
    let [a, b] = stack.pop_args::<2>("swap")?;
    stack.push(b);
    stack.push(a);
    Ok(())
}

// ── Context functions ─────────────────────────────────────────────────────────

fn set_mime_type(stack: &mut EvalStack, ctx: &mut dyn RequestContext) -> Result<(), RuntimeError> {
    let [value] = stack.pop_args::<1>("setMimeType")?;
    let raw = value.to_string();
    let mime = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(&raw);
    if mime.is_empty() {
        return Ok(());
    }
    ctx.set_mime_type(mime)?;
    Ok(())
}

fn scoped_get(
    stack: &mut EvalStack,
    function: &str,
    lookup: impl FnOnce(&str) -> Option<String>,
) -> Result<(), RuntimeError> {
    let [name, default] = stack.pop_args::<2>(function)?;
    stack.push(lookup(&name.to_string()).map_or(default, Value::Str));
    Ok(())
}

fn param_get(stack: &mut EvalStack, ctx: &mut dyn RequestContext) -> Result<(), RuntimeError> {
    scoped_get(stack, "paramGet", |name| ctx.parameter(name).map(str::to_owned))
}

fn pparam_get(stack: &mut EvalStack, ctx: &mut dyn RequestContext) -> Result<(), RuntimeError> {
    scoped_get(stack, "pparamGet", |name| {
        ctx.persistent_parameter(name).map(str::to_owned)
    })
}

fn tparam_get(stack: &mut EvalStack, ctx: &mut dyn RequestContext) -> Result<(), RuntimeError> {
    scoped_get(stack, "tparamGet", |name| {
        ctx.temporary_parameter(name).map(str::to_owned)
    })
}

fn pparam_set(stack: &mut EvalStack, ctx: &mut dyn RequestContext) -> Result<(), RuntimeError> {
    let [name, value] = stack.pop_args::<2>("pparamSet")?;
    ctx.set_persistent_parameter(&name.to_string(), &value.to_string());
    Ok(())
}

fn tparam_set(stack: &mut EvalStack, ctx: &mut dyn RequestContext) -> Result<(), RuntimeError> {
    let [name, value] = stack.pop_args::<2>("tparamSet")?;
    ctx.set_temporary_parameter(&name.to_string(), &value.to_string());
    Ok(())
}

fn pparam_del(stack: &mut EvalStack, ctx: &mut dyn RequestContext) -> Result<(), RuntimeError> {
    let [name] = stack.pop_args::<1>("pparamDel")?;
    ctx.remove_persistent_parameter(&name.to_string());
    Ok(())
}

fn tparam_del(stack: &mut EvalStack, ctx: &mut dyn RequestContext) -> Result<(), RuntimeError> {
    let [name] = stack.pop_args::<1>("tparamDel")?;
    ctx.remove_temporary_parameter(&name.to_string());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
