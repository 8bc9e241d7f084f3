//! Content transformation: [`AnalysisRecord`] → ordered [`ContentNode`]s.
//!
//! ## Smart split
//!
//! Models format list-like sections inconsistently: sometimes `- ` bullets,
//! sometimes `* `, sometimes bare lines. The rule here is deliberately
//! blunt and fixed: after stripping bullet markers and blank lines, two or
//! more remaining lines become list items, a single line becomes one
//! paragraph. Changing [`LIST_THRESHOLD`] changes the shape of every page
//! already filed, so it is a constant, not a heuristic to tune.
//!
//! ## Size ceiling
//!
//! Notion rejects any rich-text element longer than 2000 characters. Every
//! body node is cut to [`MAX_NODE_CHARS`] before construction; the rest is
//! dropped without an ellipsis.

use crate::pipeline::schema::{AnalysisRecord, ReviewField};
use serde::{Deserialize, Serialize};

/// Hard per-node text ceiling, in Unicode scalar values.
pub const MAX_NODE_CHARS: usize = 2000;

/// Minimum number of non-empty lines for a section to render as a list.
pub const LIST_THRESHOLD: usize = 2;

/// One structural unit of a review page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum ContentNode {
    Heading(String),
    Paragraph(String),
    ListItem(String),
}

impl ContentNode {
    /// A paragraph, truncated to [`MAX_NODE_CHARS`].
    pub fn paragraph(text: &str) -> Self {
        ContentNode::Paragraph(truncate(text, MAX_NODE_CHARS).to_string())
    }

    /// A list item, truncated to [`MAX_NODE_CHARS`].
    pub fn list_item(text: &str) -> Self {
        ContentNode::ListItem(truncate(text, MAX_NODE_CHARS).to_string())
    }

    pub fn text(&self) -> &str {
        match self {
            ContentNode::Heading(t) | ContentNode::Paragraph(t) | ContentNode::ListItem(t) => t,
        }
    }
}

/// Turn a validated review into the node sequence for one page.
///
/// For each field in [`ReviewField::ALL`] order: a heading, then either one
/// paragraph or one list item per line. Blank fields emit nothing at all.
pub fn transform(record: &AnalysisRecord) -> Vec<ContentNode> {
    let mut nodes = Vec::new();

    for field in ReviewField::ALL {
        let content = record.get(field);
        if content.trim().is_empty() {
            continue;
        }

        nodes.push(ContentNode::Heading(field.heading().to_string()));
        nodes.extend(content_nodes(content));
    }

    nodes
}

/// Split a section into list lines.
///
/// Returns the cleaned, non-empty lines with bullet markers removed. The
/// caller decides list vs. paragraph from the count.
pub fn smart_split(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(strip_bullet)
        .filter(|line| !line.is_empty())
        .collect()
}

fn content_nodes(content: &str) -> Vec<ContentNode> {
    let lines = smart_split(content);

    match lines.len() {
        0 => Vec::new(),
        n if n >= LIST_THRESHOLD => lines.into_iter().map(ContentNode::list_item).collect(),
        _ => vec![ContentNode::paragraph(content.trim())],
    }
}

/// Strip surrounding whitespace and any leading `- ` / `* ` markers.
fn strip_bullet(line: &str) -> &str {
    let mut rest = line.trim();
    loop {
        if let Some(stripped) = rest.strip_prefix("- ").or_else(|| rest.strip_prefix("* ")) {
            rest = stripped.trim_start();
        } else if rest == "-" || rest == "*" {
            return "";
        } else {
            return rest;
        }
    }
}

/// First `max` chars of `text`, never splitting a code point.
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
