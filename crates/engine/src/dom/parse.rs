//! HTML ingestion into a [`PageDom`].

use ego_tree::{NodeId, NodeRef};
use scraper::{Html, Node, Selector};

use super::{ElementData, PageDom, PageNode};

/// Tags whose content never carries user-visible text. The title is
/// captured separately before the copy, so the whole head goes.
const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Parse an HTML document into a mutable page tree.
///
/// Head/script/style subtrees are dropped entirely; everything else
/// keeps its document order, including whitespace-only text nodes.
pub fn parse_document(html: &str, url: &str) -> PageDom {
    let doc = Html::parse_document(html);
    let mut dom = PageDom::new(url);

    let selector = Selector::parse("title").expect("invalid selector");
    if let Some(title) = doc.select(&selector).next() {
        dom.title = title.text().collect::<String>().trim().to_string();
    }

    let root = dom.tree.root().id();
    copy_children(doc.tree.root(), root, &mut dom);
    dom
}

fn copy_children(src: NodeRef<'_, Node>, dst: NodeId, dom: &mut PageDom) {
    for child in src.children() {
        match child.value() {
            Node::Text(text) => {
                if let Some(mut parent) = dom.tree.get_mut(dst) {
                    parent.append(PageNode::Text(text.to_string()));
                }
            }
            Node::Element(element) => {
                let name = element.name().to_string();
                if SKIPPED_TAGS.contains(&name.as_str()) {
                    continue;
                }
                let mut data = ElementData::new(&name);
                for (key, value) in element.attrs() {
                    data.attrs.insert(key.to_string(), value.to_string());
                }
                let id = match dom.tree.get_mut(dst) {
                    Some(mut parent) => parent.append(PageNode::Element(data)).id(),
                    None => continue,
                };
                copy_children(child, id, dom);
            }
            // html5ever wraps everything in a Document node; fragments
            // appear when parsing snippets.
            Node::Document | Node::Fragment => copy_children(child, dst, dom),
            Node::Doctype(_) | Node::Comment(_) | Node::ProcessingInstruction(_) => {}
        }
    }
}
