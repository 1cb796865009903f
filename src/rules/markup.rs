//! Helpers over `roxmltree` nodes: attribute decoding, element paths and
//! source locations.

use roxmltree::Node;

use crate::core::ParseErrorKind;

/// Marker placed around a truncated context snippet.
pub const ELLIPSIS: &str = "…";

pub fn invalid(attribute: &str, value: &str, reason: impl Into<String>) -> ParseErrorKind {
    ParseErrorKind::InvalidValue {
        attribute: attribute.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Decode `true`/`false` (or `1`/`0`).
pub fn parse_bool(attribute: &str, value: &str) -> Result<bool, ParseErrorKind> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(invalid(attribute, value, "expected true or false")),
    }
}

pub fn parse_number(attribute: &str, value: &str) -> Result<f64, ParseErrorKind> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| invalid(attribute, value, "expected a number"))
}

pub fn parse_count(attribute: &str, value: &str) -> Result<u32, ParseErrorKind> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| invalid(attribute, value, "expected a non-negative integer"))
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Element children, skipping text, comments and processing instructions.
pub fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

/// Path segment of `node`: `tag#id` when it has an id, else `tag[n]` with
/// `n` its 1-based position among same-tag siblings.
pub fn segment(node: Node<'_, '_>) -> String {
    let tag = node.tag_name().name();
    if let Some(id) = node.attribute("id").map(str::trim).filter(|id| !id.is_empty()) {
        return format!("{tag}#{id}");
    }
    let position = node.parent().map_or(0, |parent| {
        elements(parent)
            .take_while(|sibling| *sibling != node)
            .filter(|sibling| sibling.tag_name().name() == tag)
            .count()
    });
    format!("{tag}[{}]", position + 1)
}

/// 1-based line of byte `offset`.
pub fn line_of(text: &str, offset: usize) -> usize {
    let end = floor_boundary(text, offset);
    text[..end].matches('\n').count() + 1
}

/// Up to `pre` characters before and `post` characters after `offset`.
pub fn snippet(text: &str, offset: usize, pre: usize, post: usize, padded: bool) -> String {
    let offset = floor_boundary(text, offset);
    let (head, tail) = text.split_at(offset);

    let start = head.char_indices().rev().nth(pre.saturating_sub(1)).map_or(0, |(i, _)| i);
    let start = if pre == 0 { offset } else { start };
    let end = tail.char_indices().nth(post).map_or(text.len(), |(i, _)| offset + i);

    let mut out = String::new();
    if padded && start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(&text[start..end]);
    if padded && end < text.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

fn floor_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
