//! Visual marking of located text.
//!
//! A marker is a `<mark>` element carrying the owning highlight's id,
//! spliced into the tree around the located text. Single-node matches
//! split the text node around the match. Spans whose endpoints share a
//! parent get a non-destructive wrap that reparents the covered run
//! into the marker, keeping descendant elements intact. Anything else
//! falls back to a destructive extract: the covered text is cut out of
//! each node and one marker holding the full matched string is spliced
//! at the start position. Every path re-merges adjacent text nodes so
//! later scans see normal text, and `unmark_all` restores text content
//! exactly, which keeps repeated mark/unmark cycles idempotent.

use ego_tree::NodeId;
use thiserror::Error;

use crate::dom::{ElementData, PageDom, PageNode};
use crate::locate::Location;

/// Tag used for marker elements.
pub const MARKER_TAG: &str = "mark";

/// Attribute carrying the owning highlight's id.
pub const MARKER_ATTR: &str = "data-litmark-id";

#[derive(Debug, Error)]
pub enum MarkError {
    /// The location's node is gone from the tree.
    #[error("MARK: located node is no longer in the tree")]
    NodeMissing,
    /// The tree changed since locating; the expected text is not there.
    #[error("MARK: location no longer holds the expected text")]
    StaleLocation,
}

/// Handle to a placed marker.
#[derive(Debug, Clone)]
pub struct MarkerHandle {
    pub node: NodeId,
    pub highlight_id: String,
}

fn marker_element(highlight_id: &str) -> PageNode {
    let mut data = ElementData::new(MARKER_TAG);
    data.attrs.insert(MARKER_ATTR.to_string(), highlight_id.to_string());
    PageNode::Element(data)
}

/// Wrap the located text in a marker element.
///
/// # Errors
///
/// `StaleLocation` when the tree no longer holds `text` at the given
/// location; the tree is left untouched in that case.
pub fn mark(
    dom: &mut PageDom, location: &Location, text: &str, highlight_id: &str,
) -> Result<MarkerHandle, MarkError> {
    let marker = match *location {
        Location::Node { node, offset } => mark_single(dom, node, offset, text, highlight_id)?,
        Location::Span { start, start_offset, end, end_offset } => {
            let covered = dom
                .range_text(start, start_offset, end, end_offset)
                .ok_or(MarkError::NodeMissing)?;
            if covered != text {
                return Err(MarkError::StaleLocation);
            }

            let start_parent =
                dom.tree.get(start).ok_or(MarkError::NodeMissing)?.parent().map(|p| p.id());
            let end_parent =
                dom.tree.get(end).ok_or(MarkError::NodeMissing)?.parent().map(|p| p.id());
            // Detached endpoints keep their arena content but cannot be
            // spliced around.
            let (Some(start_parent), Some(end_parent)) = (start_parent, end_parent) else {
                return Err(MarkError::NodeMissing);
            };
            let shares_parent = start_parent == end_parent;

            if shares_parent {
                wrap_span(dom, start, start_offset, end, end_offset, highlight_id)?
            } else {
                extract_span(dom, start, start_offset, end, end_offset, text, highlight_id)?
            }
        }
    };

    Ok(MarkerHandle { node: marker, highlight_id: highlight_id.to_string() })
}

fn mark_single(
    dom: &mut PageDom, node: NodeId, offset: usize, text: &str, highlight_id: &str,
) -> Result<NodeId, MarkError> {
    if dom.tree.get(node).is_none_or(|n| n.parent().is_none()) {
        return Err(MarkError::NodeMissing);
    }
    let content = dom.node_text(node).ok_or(MarkError::NodeMissing)?.to_string();
    if content.get(offset..offset + text.len()) != Some(text) {
        return Err(MarkError::StaleLocation);
    }
    let prefix = content[..offset].to_string();
    let suffix = content[offset + text.len()..].to_string();

    let marker = {
        let mut node_mut = dom.tree.get_mut(node).ok_or(MarkError::NodeMissing)?;
        let mut marker = node_mut.insert_after(marker_element(highlight_id));
        marker.append(PageNode::Text(text.to_string()));
        marker.id()
    };

    if !suffix.is_empty()
        && let Some(mut marker_mut) = dom.tree.get_mut(marker)
    {
        marker_mut.insert_after(PageNode::Text(suffix));
    }

    if prefix.is_empty() {
        if let Some(mut node_mut) = dom.tree.get_mut(node) {
            node_mut.detach();
        }
    } else {
        dom.set_node_text(node, &prefix);
    }

    Ok(marker)
}

/// Reparent the sibling run from `start` through `end` into a marker.
fn wrap_span(
    dom: &mut PageDom, start: NodeId, start_offset: usize, end: NodeId, end_offset: usize,
    highlight_id: &str,
) -> Result<NodeId, MarkError> {
    let start_text = dom.node_text(start).ok_or(MarkError::NodeMissing)?.to_string();
    let end_text = dom.node_text(end).ok_or(MarkError::NodeMissing)?.to_string();
    let prefix = start_text[..start_offset].to_string();
    let suffix = end_text[end_offset..].to_string();

    let parent = dom
        .tree
        .get(start)
        .and_then(|n| n.parent())
        .ok_or(MarkError::NodeMissing)?
        .id();

    // The covered run: start, every sibling between, end.
    let mut run = vec![start];
    if start != end {
        let mut cursor = dom.tree.get(start).ok_or(MarkError::NodeMissing)?;
        loop {
            let next = cursor.next_sibling().ok_or(MarkError::StaleLocation)?;
            run.push(next.id());
            if next.id() == end {
                break;
            }
            cursor = next;
        }
    }

    let marker = {
        let mut start_mut = dom.tree.get_mut(start).ok_or(MarkError::NodeMissing)?;
        start_mut.insert_before(marker_element(highlight_id)).id()
    };

    if !prefix.is_empty()
        && let Some(mut marker_mut) = dom.tree.get_mut(marker)
    {
        marker_mut.insert_before(PageNode::Text(prefix));
    }
    dom.set_node_text(start, &start_text[start_offset..]);
    dom.set_node_text(end, &end_text[..end_offset]);

    for id in run {
        if let Some(mut marker_mut) = dom.tree.get_mut(marker) {
            marker_mut.append_id(id);
        }
    }

    if !suffix.is_empty()
        && let Some(mut marker_mut) = dom.tree.get_mut(marker)
    {
        marker_mut.insert_after(PageNode::Text(suffix));
    }

    dom.merge_text_children(parent);
    Ok(marker)
}

/// Cut the covered text out of every node it touches and splice one
/// marker holding the full matched string at the start position.
fn extract_span(
    dom: &mut PageDom, start: NodeId, start_offset: usize, end: NodeId, end_offset: usize,
    text: &str, highlight_id: &str,
) -> Result<NodeId, MarkError> {
    let start_text = dom.node_text(start).ok_or(MarkError::NodeMissing)?.to_string();
    let end_text = dom.node_text(end).ok_or(MarkError::NodeMissing)?.to_string();
    let prefix = start_text[..start_offset].to_string();
    let suffix = end_text[end_offset..].to_string();

    let nodes = dom.text_nodes();
    let si = nodes.iter().position(|&n| n == start).ok_or(MarkError::NodeMissing)?;
    let ei = nodes.iter().position(|&n| n == end).ok_or(MarkError::NodeMissing)?;
    let between: Vec<NodeId> = nodes[si + 1..ei].to_vec();

    let marker_parent = dom
        .tree
        .get(start)
        .and_then(|n| n.parent())
        .ok_or(MarkError::NodeMissing)?
        .id();
    let end_parent = dom.tree.get(end).and_then(|n| n.parent()).map(|n| n.id());

    let marker = {
        let mut start_mut = dom.tree.get_mut(start).ok_or(MarkError::NodeMissing)?;
        let mut marker = start_mut.insert_after(marker_element(highlight_id));
        marker.append(PageNode::Text(text.to_string()));
        marker.id()
    };

    if prefix.is_empty() {
        if let Some(mut node_mut) = dom.tree.get_mut(start) {
            node_mut.detach();
        }
    } else {
        dom.set_node_text(start, &prefix);
    }

    for id in between {
        if let Some(mut node_mut) = dom.tree.get_mut(id) {
            node_mut.detach();
        }
    }

    if suffix.is_empty() {
        if let Some(mut node_mut) = dom.tree.get_mut(end) {
            node_mut.detach();
        }
    } else {
        dom.set_node_text(end, &suffix);
    }

    dom.merge_text_children(marker_parent);
    if let Some(parent) = end_parent
        && parent != marker_parent
    {
        dom.merge_text_children(parent);
    }

    Ok(marker)
}

/// Remove one marker, restoring its text content in place. A marker
/// that is already gone is a no-op.
pub fn unmark(dom: &mut PageDom, handle: &MarkerHandle) {
    remove_marker(dom, handle.node);
}

/// Remove every marker on the page, restoring text content exactly.
pub fn unmark_all(dom: &mut PageDom) -> usize {
    let markers: Vec<NodeId> = dom
        .tree
        .root()
        .descendants()
        .filter(|n| matches!(n.value(), PageNode::Element(e) if e.attr(MARKER_ATTR).is_some()))
        .map(|n| n.id())
        .collect();

    for &id in &markers {
        remove_marker(dom, id);
    }
    markers.len()
}

/// Find a rendered marker by its highlight id.
pub fn find_marker(dom: &PageDom, highlight_id: &str) -> Option<NodeId> {
    dom.tree
        .root()
        .descendants()
        .find(|n| matches!(n.value(), PageNode::Element(e) if e.attr(MARKER_ATTR) == Some(highlight_id)))
        .map(|n| n.id())
}

fn remove_marker(dom: &mut PageDom, marker: NodeId) {
    let Some(node) = dom.tree.get(marker) else { return };
    let Some(parent) = node.parent().map(|p| p.id()) else { return };

    let content = dom.subtree_text(marker);
    if let Some(mut marker_mut) = dom.tree.get_mut(marker) {
        marker_mut.insert_before(PageNode::Text(content));
        marker_mut.detach();
    }
    dom.merge_text_children(parent);
}
