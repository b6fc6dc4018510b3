//! Crate-level error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cli::UsageError;
use crate::context::ContextError;
use crate::script::{ParseError, RuntimeError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error("{}: {source}", path.display())]
    Config { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
    #[error("worker task failed: {0}")]
    Task(String),
}

impl Error {
    /// Attach the template path an error occurred in.
    pub fn in_template(self, path: impl Into<PathBuf>) -> Self {
        Error::Template {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
