//! Semantic reduction of a raw UI snapshot.
//!
//! Two passes over the arena tree:
//!
//! 1. **Merge** (post-order): descriptive text on non-interactive nodes is
//!    folded into the nearest interactive ancestor, so a button whose label
//!    lives in a nested text node surfaces as one element.
//! 2. **Flatten** (pre-order): interactive or labeled nodes with a valid
//!    on-screen rectangle get sequential 1-based ids and one display line
//!    each.
//!
//! Parsing never fails: garbage input degrades to an empty screen.

use std::collections::HashMap;

use tracing::debug;

use crate::bounds::Bounds;
use crate::markup::{UiNode, UiTree};
use crate::models::{ElementRecord, ParsedScreen, EMPTY_SCREEN_NOTICE};

/// Tunable merge behavior.
///
/// Both knobs preserve observed production behavior by default; they exist
/// because neither choice is obviously the only correct one.
#[derive(Debug, Clone, Copy)]
pub struct ParserPolicy {
    /// When a donor node has both `text` and a description, merge the text.
    pub prefer_text_over_description: bool,
    /// Merge into the nearest clickable ancestor; when false, the outermost
    /// clickable ancestor receives the text instead.
    pub merge_into_nearest_clickable: bool,
}

impl Default for ParserPolicy {
    fn default() -> Self {
        Self {
            prefer_text_over_description: true,
            merge_into_nearest_clickable: true,
        }
    }
}

/// Converts raw markup into the compact representation sent to the model.
#[derive(Debug, Clone, Default)]
pub struct ScreenParser {
    policy: ParserPolicy,
}

impl ScreenParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ParserPolicy) -> Self {
        Self { policy }
    }

    /// Parse one snapshot. `width`/`height` bound the visible screen area;
    /// elements not fully inside it are dropped.
    pub fn parse(&self, markup: &str, width: i32, height: i32) -> ParsedScreen {
        let mut tree = UiTree::build(markup);
        self.merge_pass(&mut tree);
        let screen = self.flatten(&tree, width, height);
        debug!(
            target: "screen_parser",
            nodes = tree.nodes.len(),
            surfaced = screen.element_count(),
            "parsed screen snapshot"
        );
        screen
    }

    /// Fold descriptive leaf text into interactive ancestors.
    fn merge_pass(&self, tree: &mut UiTree) {
        for index in tree.post_order() {
            let node = &tree.nodes[index];
            if node.is_clickable() || !node.has_label() {
                continue;
            }
            let Some(donor_text) = self.donor_text(node) else {
                continue;
            };

            let clickable_ancestors: Vec<usize> = tree
                .ancestors(index)
                .filter(|&a| tree.nodes[a].is_clickable())
                .collect();
            let target = if self.policy.merge_into_nearest_clickable {
                clickable_ancestors.first().copied()
            } else {
                clickable_ancestors.last().copied()
            };

            // No clickable ancestor: the node stays as it is and will be
            // surfaced on its own during flatten.
            if let Some(target) = target {
                tree.nodes[target].merged_texts.push(donor_text);
                tree.nodes[index].subsumed = true;
            }
        }
    }

    fn donor_text(&self, node: &UiNode) -> Option<String> {
        let text = node.text().trim();
        let description = node.description().trim();
        let chosen = match (text.is_empty(), description.is_empty()) {
            (true, true) => return None,
            (false, true) => text,
            (true, false) => description,
            (false, false) => {
                if self.policy.prefer_text_over_description {
                    text
                } else {
                    description
                }
            }
        };
        Some(chosen.to_string())
    }

    /// Assign ids and render display lines for important on-screen nodes.
    fn flatten(&self, tree: &UiTree, width: i32, height: i32) -> ParsedScreen {
        let mut lines: Vec<String> = Vec::new();
        let mut lookup: HashMap<u32, ElementRecord> = HashMap::new();
        let mut next_id = 1u32;

        for index in tree.pre_order() {
            let node = &tree.nodes[index];
            let important = node.is_clickable() || (node.has_label() && !node.subsumed);
            if !important {
                continue;
            }
            let Some(bounds) = Bounds::parse(node.bounds_raw()) else {
                continue;
            };
            if !bounds.visible_within(width, height) {
                continue;
            }

            let record = ElementRecord {
                resource_id: node.resource_id().to_string(),
                text: combined_text(node),
                description: node.description().trim().to_string(),
                class_name: node.class_name().to_string(),
                bounds_raw: node.bounds_raw().to_string(),
                bounds,
                clickable: node.is_clickable(),
                long_clickable: node.is_long_clickable(),
                password: node.is_password(),
            };
            lines.push(render_line(next_id, &record));
            lookup.insert(next_id, record);
            next_id += 1;
        }

        let display = if lines.is_empty() {
            EMPTY_SCREEN_NOTICE.to_string()
        } else {
            lines.join("\n")
        };
        ParsedScreen { display, lookup }
    }
}

/// Own text joined with texts merged up from subsumed descendants.
fn combined_text(node: &UiNode) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(1 + node.merged_texts.len());
    let own = node.text().trim();
    if !own.is_empty() {
        parts.push(own);
    }
    for merged in &node.merged_texts {
        parts.push(merged.as_str());
    }
    parts.join(" | ")
}

fn render_line(id: u32, record: &ElementRecord) -> String {
    let mut flags: Vec<&str> = Vec::new();
    if record.clickable {
        flags.push("clickable");
    }
    if record.long_clickable {
        flags.push("long-clickable");
    }
    if record.password {
        flags.push("password");
    }

    let class = short_class(&record.class_name);
    let mut line = format!("[{}]<{}> {}", id, class, record.label());
    if !flags.is_empty() {
        line.push_str(&format!(" ({})", flags.join(", ")));
    }
    line
}

fn short_class(class: &str) -> &str {
    class.rsplit('.').next().unwrap_or(class)
}
