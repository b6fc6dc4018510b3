//! Tree writer: turns a parsed [`Document`] back into template source.
//!
//! The output is not byte-identical to the original template (whitespace
//! inside tags is normalised and numbers are printed canonically), but
//! parsing it again yields a structurally equal document.

use std::fmt::Write as _;

use super::element::Element;
use super::node::{Document, Node, NodeId};

/// Reconstruct template source for `doc`.
pub fn write_tree(doc: &Document) -> String {
    let mut out = String::new();
    write_node(doc, doc.root(), &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.node(id) {
        Node::Document { children } => write_children(doc, children, out),
        Node::Text(text) => escape_text(text, out),
        Node::Echo(elements) => {
            out.push_str("{$=");
            write_elements(elements, out);
            out.push_str(" $}");
        }
        Node::Loop(lp) => {
            let _ = write!(out, "{{$ FOR {} {} {}", lp.variable, lp.start, lp.end);
            if let Some(step) = &lp.step {
                let _ = write!(out, " {step}");
            }
            out.push_str(" $}");
            write_children(doc, &lp.children, out);
            out.push_str("{$END$}");
        }
    }
}

fn write_children(doc: &Document, children: &[NodeId], out: &mut String) {
    let mut after_text = false;
    for &child in children {
        let is_text = matches!(doc.node(child), Node::Text(_));
        // An empty tag keeps neighbouring text nodes apart.
        if is_text && after_text {
            out.push_str("{$$}");
        }
        write_node(doc, child, out);
        after_text = is_text;
    }
}

fn write_elements(elements: &[Element], out: &mut String) {
    for el in elements {
        out.push(' ');
        out.push_str(&el.as_text());
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            c => out.push(c),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
