//! Selection snapshotting.
//!
//! A live selection is invalidated by almost any later interaction, so
//! everything a future save needs is copied out synchronously at
//! selection time: the trimmed text, the range endpoints, a bounding
//! box in document coordinates, and a context window for relocation.

use ego_tree::NodeId;
use litmark_core::{TextPosition, limits};

use crate::dom::PageDom;

/// Detached, storage-safe copy of one user selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSnapshot {
    /// Trimmed selected text, 1..1000 chars.
    pub text: String,
    pub start: NodeId,
    pub start_offset: usize,
    pub end: NodeId,
    pub end_offset: usize,
    /// Up to 200 chars either side of the selection, from the nearest
    /// enclosing element's text.
    pub context: String,
    /// Bounding box in document coordinates, when the embedder has
    /// annotated a rectangle for the range.
    pub position: Option<TextPosition>,
}

/// Snapshot a selection range. Returns `None` for selections that trim
/// to nothing, exceed the text cap, or whose endpoints do not resolve.
pub fn capture(
    dom: &PageDom, start: NodeId, start_offset: usize, end: NodeId, end_offset: usize,
) -> Option<SelectionSnapshot> {
    let raw = dom.range_text(start, start_offset, end, end_offset)?;
    let text = raw.trim();
    if text.is_empty() || text.chars().count() >= limits::MAX_TEXT_CHARS {
        return None;
    }

    let position = dom.rect_of(start).map(|rect| dom.to_document_coords(rect));

    Some(SelectionSnapshot {
        text: text.to_string(),
        start,
        start_offset,
        end,
        end_offset,
        context: context_window(&dom.enclosing_element_text(start), text),
        position,
    })
}

/// Up to `CONTEXT_CHARS` chars either side of the first occurrence of
/// `text` in `source`; the head of `source` when the text is not found.
fn context_window(source: &str, text: &str) -> String {
    let Some(idx) = source.find(text) else {
        return source.chars().take(2 * limits::CONTEXT_CHARS).collect();
    };

    let before: String = source[..idx]
        .chars()
        .rev()
        .take(limits::CONTEXT_CHARS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let after: String = source[idx + text.len()..].chars().take(limits::CONTEXT_CHARS).collect();
    format!("{before}{text}{after}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;

    const URL: &str = "https://example.com/page";

    #[test]
    fn test_capture_trims_and_records_range() {
        let dom = parse_document("<body><p>alpha beta gamma</p></body>", URL);
        let node = dom.text_nodes()[0];

        // "alpha beta gamma": select " beta " with surrounding spaces.
        let snapshot = capture(&dom, node, 5, node, 11).unwrap();
        assert_eq!(snapshot.text, "beta");
        assert_eq!(snapshot.start_offset, 5);
        assert_eq!(snapshot.end_offset, 11);
    }

    #[test]
    fn test_capture_rejects_empty() {
        let dom = parse_document("<body><p>alpha   beta</p></body>", URL);
        let node = dom.text_nodes()[0];
        assert!(capture(&dom, node, 5, node, 8).is_none());
    }

    #[test]
    fn test_capture_rejects_over_cap() {
        let long = "x".repeat(1200);
        let dom = parse_document(&format!("<body><p>{long}</p></body>"), URL);
        let node = dom.text_nodes()[0];
        assert!(capture(&dom, node, 0, node, 1200).is_none());
    }

    #[test]
    fn test_capture_cross_node() {
        let dom = parse_document("<body><p>one <em>two</em> three</p></body>", URL);
        let nodes = dom.text_nodes();

        let snapshot = capture(&dom, nodes[0], 0, nodes[2], 6).unwrap();
        assert_eq!(snapshot.text, "one two three");
    }

    #[test]
    fn test_capture_context_window() {
        let dom = parse_document("<body><p>before words target phrase after words</p></body>", URL);
        let node = dom.text_nodes()[0];

        let snapshot = capture(&dom, node, 13, node, 26).unwrap();
        assert_eq!(snapshot.text, "target phrase");
        assert!(snapshot.context.contains("before words"));
        assert!(snapshot.context.contains("after words"));
    }

    #[test]
    fn test_capture_position_in_document_coords() {
        let mut dom = parse_document("<body><p>some selectable text</p></body>", URL);
        dom.scroll_y = 500.0;
        let node = dom.text_nodes()[0];
        dom.set_rect(node, TextPosition { top: 40.0, left: 10.0, width: 120.0, height: 18.0 });

        let snapshot = capture(&dom, node, 0, node, 4).unwrap();
        let position = snapshot.position.unwrap();
        assert_eq!(position.top, 540.0);
        assert_eq!(position.left, 10.0);
    }

    #[test]
    fn test_capture_without_rect_has_no_position() {
        let dom = parse_document("<body><p>plain text</p></body>", URL);
        let node = dom.text_nodes()[0];
        assert!(capture(&dom, node, 0, node, 5).unwrap().position.is_none());
    }
}
