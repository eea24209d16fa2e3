//! Mutable page document tree.
//!
//! The engine operates on its own tree rather than a parsed-HTML view
//! because marking rewrites text nodes in place. [`PageDom`] owns the
//! tree plus the page metadata the rest of the engine needs (url,
//! title, scroll offsets) and a side table of layout rectangles.
//! Rectangles are embedder-supplied annotations: the engine has no
//! layout pass, so whoever renders the page reports boxes through
//! [`PageDom::set_rect`] and lookups fall back to the nearest annotated
//! ancestor.

mod parse;

pub use parse::parse_document;

use std::collections::{BTreeMap, HashMap};

use ego_tree::{NodeId, Tree};
use litmark_core::TextPosition;

/// One node of the page tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PageNode {
    Document,
    Element(ElementData),
    Text(String),
}

/// Tag name plus attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub name: String,
    pub attrs: BTreeMap<String, String>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), attrs: BTreeMap::new() }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// A page document plus the metadata the engine works against.
#[derive(Debug)]
pub struct PageDom {
    pub tree: Tree<PageNode>,
    pub url: String,
    pub title: String,
    pub scroll_x: f64,
    pub scroll_y: f64,
    rects: HashMap<NodeId, TextPosition>,
}

impl PageDom {
    /// Empty document for the given page URL.
    pub fn new(url: &str) -> Self {
        Self {
            tree: Tree::new(PageNode::Document),
            url: url.to_string(),
            title: String::new(),
            scroll_x: 0.0,
            scroll_y: 0.0,
            rects: HashMap::new(),
        }
    }

    /// The page's domain, derived from its URL.
    pub fn domain(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_default()
    }

    /// All text nodes in document order.
    pub fn text_nodes(&self) -> Vec<NodeId> {
        self.tree
            .root()
            .descendants()
            .filter(|n| matches!(n.value(), PageNode::Text(_)))
            .map(|n| n.id())
            .collect()
    }

    /// The text of a node, if it is a text node.
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match self.tree.get(id)?.value() {
            PageNode::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    /// Overwrite the text of a text node. No-op for other node kinds.
    pub fn set_node_text(&mut self, id: NodeId, text: &str) {
        if let Some(mut node) = self.tree.get_mut(id)
            && let PageNode::Text(t) = node.value()
        {
            *t = text.to_string();
        }
    }

    /// Concatenated text of the whole document, in document order.
    pub fn text_content(&self) -> String {
        self.subtree_text(self.tree.root().id())
    }

    /// Concatenated text of a subtree, in document order.
    pub fn subtree_text(&self, id: NodeId) -> String {
        let Some(node) = self.tree.get(id) else {
            return String::new();
        };
        let mut out = String::new();
        for n in node.descendants() {
            if let PageNode::Text(t) = n.value() {
                out.push_str(t);
            }
        }
        out
    }

    /// Text of the nearest element enclosing `id` (the node itself if
    /// it is an element). Used as the context window source.
    pub fn enclosing_element_text(&self, id: NodeId) -> String {
        let mut current = self.tree.get(id);
        while let Some(node) = current {
            if matches!(node.value(), PageNode::Element(_)) {
                return self.subtree_text(node.id());
            }
            current = node.parent();
        }
        self.text_content()
    }

    /// The text covered by a range over text nodes, stitched in
    /// document order. Offsets are byte offsets; `end_offset` is
    /// exclusive. `None` when the endpoints are gone, out of order, or
    /// the offsets are off a character boundary.
    pub fn range_text(
        &self, start: NodeId, start_offset: usize, end: NodeId, end_offset: usize,
    ) -> Option<String> {
        if start == end {
            return self.node_text(start)?.get(start_offset..end_offset).map(String::from);
        }
        let nodes = self.text_nodes();
        let si = nodes.iter().position(|&n| n == start)?;
        let ei = nodes.iter().position(|&n| n == end)?;
        if ei < si {
            return None;
        }

        let mut out = String::new();
        out.push_str(self.node_text(start)?.get(start_offset..)?);
        for &mid in &nodes[si + 1..ei] {
            out.push_str(self.node_text(mid)?);
        }
        out.push_str(self.node_text(end)?.get(..end_offset)?);
        Some(out)
    }

    /// Annotate a node with its layout rectangle (viewport coordinates).
    pub fn set_rect(&mut self, id: NodeId, rect: TextPosition) {
        self.rects.insert(id, rect);
    }

    /// The rectangle for a node, falling back to the nearest annotated
    /// ancestor. `None` when no ancestor carries a rectangle.
    pub fn rect_of(&self, id: NodeId) -> Option<TextPosition> {
        let mut current = self.tree.get(id);
        while let Some(node) = current {
            if let Some(rect) = self.rects.get(&node.id()) {
                return Some(*rect);
            }
            current = node.parent();
        }
        None
    }

    /// Convert a viewport rectangle to document coordinates.
    pub fn to_document_coords(&self, rect: TextPosition) -> TextPosition {
        TextPosition {
            top: rect.top + self.scroll_y,
            left: rect.left + self.scroll_x,
            width: rect.width,
            height: rect.height,
        }
    }

    /// Coalesce adjacent text children of `parent` and drop empty text
    /// nodes, so later scans see normal text rather than the fragments
    /// a mark/unmark pass leaves behind.
    pub fn merge_text_children(&mut self, parent: NodeId) {
        let children: Vec<(NodeId, Option<String>)> = match self.tree.get(parent) {
            Some(node) => node
                .children()
                .map(|c| {
                    let text = match c.value() {
                        PageNode::Text(t) => Some(t.clone()),
                        _ => None,
                    };
                    (c.id(), text)
                })
                .collect(),
            None => return,
        };

        let mut run_head: Option<NodeId> = None;
        for (id, text) in children {
            match text {
                Some(t) if t.is_empty() => {
                    if let Some(mut node) = self.tree.get_mut(id) {
                        node.detach();
                    }
                }
                Some(t) => match run_head {
                    Some(head) => {
                        if let Some(mut node) = self.tree.get_mut(head)
                            && let PageNode::Text(existing) = node.value()
                        {
                            existing.push_str(&t);
                        }
                        if let Some(mut node) = self.tree.get_mut(id) {
                            node.detach();
                        }
                    }
                    None => run_head = Some(id),
                },
                None => run_head = None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_dom() -> (PageDom, NodeId, Vec<NodeId>) {
        let mut dom = PageDom::new("https://example.com/page");
        let mut root = dom.tree.root_mut();
        let mut p = root.append(PageNode::Element(ElementData::new("p")));
        let a = p.append(PageNode::Text("hello ".into())).id();
        let b = p.append(PageNode::Text(String::new())).id();
        let c = p.append(PageNode::Text("world".into())).id();
        let p = p.id();
        (dom, p, vec![a, b, c])
    }

    #[test]
    fn test_text_nodes_document_order() {
        let (dom, _, ids) = build_dom();
        assert_eq!(dom.text_nodes(), ids);
    }

    #[test]
    fn test_text_content_concatenates() {
        let (dom, _, _) = build_dom();
        assert_eq!(dom.text_content(), "hello world");
    }

    #[test]
    fn test_merge_text_children() {
        let (mut dom, p, ids) = build_dom();
        dom.merge_text_children(p);
        assert_eq!(dom.node_text(ids[0]), Some("hello world"));
        assert_eq!(dom.text_nodes(), vec![ids[0]]);
    }

    #[test]
    fn test_merge_stops_at_elements() {
        let mut dom = PageDom::new("https://example.com");
        let mut root = dom.tree.root_mut();
        let mut p = root.append(PageNode::Element(ElementData::new("p")));
        let a = p.append(PageNode::Text("a".into())).id();
        p.append(PageNode::Element(ElementData::new("b")));
        let c = p.append(PageNode::Text("c".into())).id();
        let p = p.id();

        dom.merge_text_children(p);
        assert_eq!(dom.node_text(a), Some("a"));
        assert_eq!(dom.node_text(c), Some("c"));
    }

    #[test]
    fn test_rect_ancestor_fallback() {
        let (mut dom, p, ids) = build_dom();
        let rect = TextPosition { top: 10.0, left: 20.0, width: 100.0, height: 16.0 };
        dom.set_rect(p, rect);
        assert_eq!(dom.rect_of(ids[0]), Some(rect));
        assert_eq!(dom.rect_of(p), Some(rect));
    }

    #[test]
    fn test_rect_missing() {
        let (dom, _, ids) = build_dom();
        assert_eq!(dom.rect_of(ids[0]), None);
    }

    #[test]
    fn test_document_coords_apply_scroll() {
        let mut dom = PageDom::new("https://example.com");
        dom.scroll_x = 5.0;
        dom.scroll_y = 300.0;
        let rect = TextPosition { top: 10.0, left: 20.0, width: 1.0, height: 1.0 };
        let doc = dom.to_document_coords(rect);
        assert_eq!(doc.top, 310.0);
        assert_eq!(doc.left, 25.0);
    }

    #[test]
    fn test_domain_from_url() {
        let dom = PageDom::new("https://news.example.org/a/b?q=1");
        assert_eq!(dom.domain(), "news.example.org");
        let dom = PageDom::new("not a url");
        assert_eq!(dom.domain(), "");
    }
}
