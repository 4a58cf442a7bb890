//! Forgiving reader for raw screen markup.
//!
//! The capture layer hands us a DOM-like textual snapshot of the UI
//! hierarchy. Inputs arrive from an external process and are routinely
//! truncated or mangled, so the reader is tolerant by construction:
//! malformed markup produces a partial or empty tree, never an error.
//!
//! Nodes live in an arena indexed by position; the parent link is an index
//! with `None` marking a root. This keeps lifetimes trivial and lets the
//! tree be rebuilt cheaply on every perception cycle.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<\s*(/?)\s*([A-Za-z][A-Za-z0-9._$-]*)((?:[^<>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("tag pattern is valid")
});

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z][A-Za-z0-9_:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern is valid")
});

/// One node of the captured UI hierarchy.
#[derive(Debug, Clone, Default)]
pub struct UiNode {
    /// Raw attribute map as found in the markup.
    pub attrs: HashMap<String, String>,
    /// Arena index of the parent, `None` for roots.
    pub parent: Option<usize>,
    /// Arena indices of the children, in document order.
    pub children: Vec<usize>,
    /// Texts folded in from subsumed descendants during the merge pass.
    pub(crate) merged_texts: Vec<String>,
    /// Set when this node's text was merged into an ancestor.
    pub(crate) subsumed: bool,
}

impl UiNode {
    fn attr(&self, name: &str) -> &str {
        self.attrs.get(name).map(String::as_str).unwrap_or("")
    }

    fn flag(&self, name: &str) -> bool {
        self.attr(name) == "true"
    }

    pub fn text(&self) -> &str {
        self.attr("text")
    }

    pub fn description(&self) -> &str {
        self.attr("content-desc")
    }

    pub fn class_name(&self) -> &str {
        self.attr("class")
    }

    pub fn resource_id(&self) -> &str {
        self.attr("resource-id")
    }

    pub fn bounds_raw(&self) -> &str {
        self.attr("bounds")
    }

    pub fn is_clickable(&self) -> bool {
        self.flag("clickable")
    }

    pub fn is_long_clickable(&self) -> bool {
        self.flag("long-clickable")
    }

    pub fn is_password(&self) -> bool {
        self.flag("password")
    }

    /// True when the node carries a non-blank text or description.
    pub fn has_label(&self) -> bool {
        !self.text().trim().is_empty() || !self.description().trim().is_empty()
    }
}

/// Arena-backed UI hierarchy built from one markup snapshot.
#[derive(Debug, Clone, Default)]
pub struct UiTree {
    pub nodes: Vec<UiNode>,
    pub roots: Vec<usize>,
}

impl UiTree {
    /// Build a tree from raw markup.
    ///
    /// Unclosed tags, stray closers, declarations, comments, and junk
    /// between tags are all tolerated; whatever structure can be recovered
    /// is kept.
    pub fn build(markup: &str) -> Self {
        let mut tree = UiTree::default();
        let mut stack: Vec<usize> = Vec::new();

        for caps in TAG_RE.captures_iter(markup) {
            let closing = !caps[1].is_empty();
            if closing {
                // A stray closer with an empty stack is simply ignored.
                stack.pop();
                continue;
            }

            let mut attr_blob = caps[3].trim_end();
            let self_closing = attr_blob.ends_with('/');
            if self_closing {
                attr_blob = attr_blob[..attr_blob.len() - 1].trim_end();
            }

            let mut attrs = parse_attrs(attr_blob);
            attrs
                .entry("class".to_string())
                .or_insert_with(|| caps[2].to_string());

            let index = tree.nodes.len();
            let parent = stack.last().copied();
            tree.nodes.push(UiNode {
                attrs,
                parent,
                children: Vec::new(),
                merged_texts: Vec::new(),
                subsumed: false,
            });

            match parent {
                Some(p) => tree.nodes[p].children.push(index),
                None => tree.roots.push(index),
            }

            if !self_closing {
                stack.push(index);
            }
        }

        tree
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node indices in pre-order (document order).
    pub fn pre_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            order.push(index);
            for &child in self.nodes[index].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Node indices in post-order (children before parents).
    pub fn post_order(&self) -> Vec<usize> {
        // Reverse of a pre-order walk that takes subtrees right-to-left.
        let mut stack: Vec<usize> = self.roots.clone();
        let mut output: Vec<usize> = Vec::with_capacity(self.nodes.len());
        while let Some(index) = stack.pop() {
            output.push(index);
            for &child in &self.nodes[index].children {
                stack.push(child);
            }
        }
        output.reverse();
        output
    }

    /// Walk ancestors of `index`, nearest first.
    pub fn ancestors(&self, index: usize) -> AncestorIter<'_> {
        AncestorIter {
            tree: self,
            current: self.nodes[index].parent,
        }
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct AncestorIter<'a> {
    tree: &'a UiTree,
    current: Option<usize>,
}

impl<'a> Iterator for AncestorIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let index = self.current?;
        self.current = self.tree.nodes[index].parent;
        Some(index)
    }
}

fn parse_attrs(blob: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for caps in ATTR_RE.captures_iter(blob) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or("");
        attrs.insert(caps[1].to_string(), unescape(value));
    }
    attrs
}

/// Decode the entity escapes the capture layer emits. `&amp;` is decoded
/// last so already-escaped sequences survive one round intact.
fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
