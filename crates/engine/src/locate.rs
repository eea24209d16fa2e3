//! Text re-identification in a live page tree.
//!
//! Exact substring match is necessary but not sufficient: pages mutate
//! between visits, so a saved string may sit in a different node, be
//! surrounded by new content, or be fragmented across inline elements.
//! The locator scans for candidate nodes, disambiguates with stored
//! context and position hints, and falls back to stitching text across
//! element boundaries when no single node holds the whole string.

use ego_tree::NodeId;
use litmark_core::{TextPosition, limits};

use crate::dom::PageDom;

/// Where a piece of text lives in the page tree.
///
/// Offsets are byte offsets into the owning node's text and always lie
/// on character boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Contained in a single text node, starting at `offset`.
    Node { node: NodeId, offset: usize },
    /// Spans multiple text nodes; `end_offset` is exclusive.
    Span { start: NodeId, start_offset: usize, end: NodeId, end_offset: usize },
}

impl Location {
    /// The node the location starts in.
    pub fn start_node(&self) -> NodeId {
        match self {
            Location::Node { node, .. } => *node,
            Location::Span { start, .. } => *start,
        }
    }
}

/// Disambiguation hints carried by a stored highlight.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocateHints<'a> {
    /// Surrounding text captured at selection time.
    pub context: Option<&'a str>,
    /// Bounding box at capture time, document coordinates.
    pub position: Option<TextPosition>,
}

/// Scan for text nodes containing `text`, in document order.
///
/// Short strings (< 3 chars) match almost everywhere, so their scan
/// skips nodes too short to contain the text and stops after 10 hits;
/// longer strings consider only meaningful nodes (trimmed length >= 2)
/// and stop after 5.
pub fn find_text_nodes(dom: &PageDom, text: &str) -> Vec<NodeId> {
    if text.is_empty() {
        return Vec::new();
    }
    let short = text.chars().count() < limits::SHORT_TEXT_CHARS;
    let cap = if short { limits::SHORT_TEXT_MATCH_CAP } else { limits::TEXT_MATCH_CAP };

    let mut matches = Vec::new();
    for id in dom.text_nodes() {
        let Some(content) = dom.node_text(id) else { continue };
        if short {
            if content.len() < text.len() {
                continue;
            }
        } else if content.trim().chars().count() < 2 {
            continue;
        }
        if content.contains(text) {
            matches.push(id);
            if matches.len() >= cap {
                break;
            }
        }
    }
    matches
}

/// Find the best location for `text` in the page.
///
/// A sole candidate wins outright. Among several, stored context picks
/// the candidate whose local window shares the most words; failing
/// that, the stored bounding box picks the geometrically nearest; the
/// first match is the last resort. When no single node contains the
/// string, the cross-element fallback stitches the document's text
/// nodes together and maps the match back to a start/end pair.
pub fn locate(dom: &PageDom, text: &str, hints: LocateHints<'_>) -> Option<Location> {
    let candidates = find_text_nodes(dom, text);
    locate_among(dom, &candidates, text, hints)
}

/// Disambiguate among pre-scanned candidate nodes (a cached scan
/// result); behaves exactly like [`locate`] given the same candidates.
pub fn locate_among(
    dom: &PageDom, candidates: &[NodeId], text: &str, hints: LocateHints<'_>,
) -> Option<Location> {
    let node = match candidates {
        [] => return locate_across_elements(dom, text),
        [only] => *only,
        _ => hints
            .context
            .and_then(|ctx| pick_by_context(dom, candidates, text, ctx))
            .or_else(|| hints.position.and_then(|pos| pick_by_position(dom, candidates, pos)))
            .unwrap_or(candidates[0]),
    };

    let offset = dom.node_text(node)?.find(text)?;
    Some(Location::Node { node, offset })
}

/// Score candidates by word overlap between the stored context and a
/// local window of 50 chars either side of the match.
fn pick_by_context(dom: &PageDom, candidates: &[NodeId], text: &str, context: &str) -> Option<NodeId> {
    let stored: Vec<String> = context.split_whitespace().map(str::to_lowercase).collect();
    if stored.is_empty() {
        return None;
    }

    let mut best: Option<(NodeId, f64)> = None;
    for &id in candidates {
        let Some(content) = dom.node_text(id) else { continue };
        let Some(idx) = content.find(text) else { continue };

        let before: String = content[..idx]
            .chars()
            .rev()
            .take(limits::SCORE_CONTEXT_CHARS)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let after: String = content[idx + text.len()..].chars().take(limits::SCORE_CONTEXT_CHARS).collect();
        let window = format!("{before}{text}{after}");

        let words: Vec<String> = window.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            continue;
        }
        let shared = words.iter().filter(|w| stored.contains(w)).count();
        let score = shared as f64 / words.len() as f64;

        if best.is_none_or(|(_, s)| score > s) {
            best = Some((id, score));
        }
    }
    best.map(|(id, _)| id)
}

/// Pick the candidate whose live box is nearest the stored position.
fn pick_by_position(dom: &PageDom, candidates: &[NodeId], position: TextPosition) -> Option<NodeId> {
    let mut best: Option<(NodeId, f64)> = None;
    for &id in candidates {
        let Some(rect) = dom.rect_of(id) else { continue };
        let distance = dom.to_document_coords(rect).distance_to(&position);
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((id, distance));
        }
    }
    best.map(|(id, _)| id)
}

/// Locate text that page markup has split across inline elements.
fn locate_across_elements(dom: &PageDom, text: &str) -> Option<Location> {
    let mut concat = String::new();
    let mut table: Vec<(usize, NodeId, usize)> = Vec::new();
    for id in dom.text_nodes() {
        let Some(t) = dom.node_text(id) else { continue };
        if t.is_empty() {
            continue;
        }
        table.push((concat.len(), id, t.len()));
        concat.push_str(t);
    }

    let start = concat.find(text)?;
    let end = start + text.len();

    let (start_node, start_offset) = map_start(&table, start)?;
    let (end_node, end_offset) = map_end(&table, end)?;

    if start_node == end_node {
        Some(Location::Node { node: start_node, offset: start_offset })
    } else {
        Some(Location::Span { start: start_node, start_offset, end: end_node, end_offset })
    }
}

fn map_start(table: &[(usize, NodeId, usize)], offset: usize) -> Option<(NodeId, usize)> {
    table
        .iter()
        .find(|(base, _, len)| offset >= *base && offset < base + len)
        .map(|(base, id, _)| (*id, offset - base))
}

fn map_end(table: &[(usize, NodeId, usize)], offset: usize) -> Option<(NodeId, usize)> {
    table
        .iter()
        .find(|(base, _, len)| offset > *base && offset <= base + len)
        .map(|(base, id, _)| (*id, offset - base))
}
