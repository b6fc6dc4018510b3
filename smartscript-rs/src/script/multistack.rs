//! Named stack registry.
//!
//! Maps a variable name to its own LIFO stack of [`ValueCell`]s.  Loops push
//! a binding on entry and pop it on exit, so a nested loop that reuses a name
//! shadows the outer binding only while it runs.

use std::collections::HashMap;

use super::value::ValueCell;

#[derive(Debug, Default)]
pub struct MultiStack {
    stacks: HashMap<String, Vec<ValueCell>>,
}

impl MultiStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `cell` on top of the stack called `name`.
    pub fn push(&mut self, name: &str, cell: ValueCell) {
        self.stacks.entry(name.to_owned()).or_default().push(cell);
    }

    /// Remove and return the top of `name`.  Empty stacks are dropped from
    /// the map.
    pub fn pop(&mut self, name: &str) -> Option<ValueCell> {
        let stack = self.stacks.get_mut(name)?;
        let top = stack.pop();
        if stack.is_empty() {
            self.stacks.remove(name);
        }
        top
    }

    pub fn peek(&self, name: &str) -> Option<&ValueCell> {
        self.stacks.get(name)?.last()
    }

    pub fn peek_mut(&mut self, name: &str) -> Option<&mut ValueCell> {
        self.stacks.get_mut(name)?.last_mut()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
