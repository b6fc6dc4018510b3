//! Runtime values for SmartScript evaluation.
//!
//! Two layers live here:
//!
//! - [`Value`] is what moves across the echo evaluation stack: an integer, a
//!   double, or a string that has not been coerced yet.
//! - [`ValueCell`] is the numeric box stored in the named stack registry for
//!   loop variables.  It always holds a normalised `f64`; a missing input
//!   (`None`) counts as `0`, and anything that does not parse as a number is
//!   rejected at construction time.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// Divisors whose magnitude is at or below this are treated as zero.
pub const ZERO_THRESHOLD: f64 = 1e-10;

/// Error produced while coercing or combining values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("value {0:?} is not a valid number")]
    NotANumber(String),
    #[error("division by zero")]
    DivisionByZero,
}

/// A SmartScript runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Str(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(x) => {
                // Whole doubles keep a trailing `.0`.
                if x.is_finite() && x.fract() == 0.0 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl Value {
    /// Coerce to `f64`, parsing strings.
    pub fn to_number(&self) -> Result<f64, ValueError> {
        match self {
            Value::Int(n) => Ok(*n as f64),
            Value::Double(x) => Ok(*x),
            Value::Str(s) => parse_number(s),
        }
    }

    /// Narrow a float to [`Value::Int`] when it has no fractional part.
    pub fn narrow(x: f64) -> Value {
        if x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
            Value::Int(x as i64)
        } else {
            Value::Double(x)
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

fn parse_number(s: &str) -> Result<f64, ValueError> {
    let trimmed = s.trim();
    match trimmed.parse::<f64>() {
        Ok(x) if x.is_finite() || trimmed.chars().any(|c| c.is_ascii_digit()) => Ok(x),
        _ => Err(ValueError::NotANumber(s.to_owned())),
    }
}

/// Coerce an optional operand; `None` stands for a null input and means `0`.
fn coerce(value: Option<&Value>) -> Result<f64, ValueError> {
    value.map_or(Ok(0.0), Value::to_number)
}

// ── ValueCell ─────────────────────────────────────────────────────────────────

/// Numeric value box with the coercion rules used by loop variables and the
/// arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValueCell {
    value: f64,
}

impl ValueCell {
    /// Build a cell from an optional value.
    ///
    /// `None` yields `0`; a string that does not parse as a number is an error.
    pub fn new(init: Option<&Value>) -> Result<Self, ValueError> {
        Ok(ValueCell {
            value: coerce(init)?,
        })
    }

    pub fn set_value(&mut self, value: Option<&Value>) -> Result<(), ValueError> {
        self.value = coerce(value)?;
        Ok(())
    }

    /// The stored value, narrowed to an integer when whole.
    pub fn get_value(&self) -> Value {
        Value::narrow(self.value)
    }

    pub fn increment(&mut self, by: Option<&Value>) -> Result<(), ValueError> {
        self.value += coerce(by)?;
        Ok(())
    }

    pub fn decrement(&mut self, by: Option<&Value>) -> Result<(), ValueError> {
        self.value -= coerce(by)?;
        Ok(())
    }

    pub fn multiply(&mut self, by: Option<&Value>) -> Result<(), ValueError> {
        self.value *= coerce(by)?;
        Ok(())
    }

    /// Divide in place.  A `None` divisor, or one within [`ZERO_THRESHOLD`]
    /// of zero, is a division by zero.
    pub fn divide(&mut self, by: Option<&Value>) -> Result<(), ValueError> {
        let divisor = by.ok_or(ValueError::DivisionByZero)?.to_number()?;
        if divisor.abs() <= ZERO_THRESHOLD {
            return Err(ValueError::DivisionByZero);
        }
        self.value /= divisor;
        Ok(())
    }

    /// Sign of `self - other` after coercion.
    pub fn num_compare(&self, other: Option<&Value>) -> Result<Ordering, ValueError> {
        let diff = self.value - coerce(other)?;
        Ok(if diff > 0.0 {
            Ordering::Greater
        } else if diff < 0.0 {
            Ordering::Less
        } else {
            Ordering::Equal
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
