//! SmartScript: a small template language for generating text documents.
//!
//! Templates mix literal text with `{$ ... $}` tags.  See [`script`] for the
//! language itself and [`context`] for the environment a render writes to.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod script;

pub use error::{Error, Result};
