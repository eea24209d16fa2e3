//! Page-side orchestration.
//!
//! The controller owns one page's document, its node cache, and the at
//! most one pending selection, and wires them to the background
//! service: selection → save → broadcast → re-mark. Locating failures
//! during a mark pass are non-fatal; the affected highlight is left
//! unmarked and the pass continues.

use ego_tree::NodeId;
use litmark_core::model::{now_millis, truncate_chars};
use litmark_core::{Error, Highlight, TextPosition, limits};
use litmark_service::{Notification, ServiceHandle};
use tokio::sync::broadcast;

use crate::dom::PageDom;
use crate::fragment::parse_fragment;
use crate::locate::{LocateHints, Location, find_text_nodes, locate_among};
use crate::mark::{MarkerHandle, find_marker, mark, unmark_all};
use crate::node_cache::NodeCache;
use crate::selection::{SelectionSnapshot, capture};

/// Marker id used for a fragment-navigation target, which has no
/// persisted highlight of its own.
const FRAGMENT_MARKER_ID: &str = "litmark-fragment";

/// Controller for one open page.
pub struct PageController {
    dom: PageDom,
    service: ServiceHandle,
    cache: NodeCache,
    pending: Option<SelectionSnapshot>,
    markers: Vec<MarkerHandle>,
}

impl PageController {
    pub fn new(dom: PageDom, service: ServiceHandle) -> Self {
        Self { dom, service, cache: NodeCache::default(), pending: None, markers: Vec::new() }
    }

    pub fn dom(&self) -> &PageDom {
        &self.dom
    }

    /// Mutable access for the embedder (DOM updates, rect annotations).
    pub fn dom_mut(&mut self) -> &mut PageDom {
        &mut self.dom
    }

    /// Listen for storage-update notifications.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<Notification> {
        self.service.subscribe()
    }

    /// Snapshot a new selection, replacing any previous pending one.
    /// Returns the snapshot, or `None` (and no pending selection) when
    /// the range rejects.
    pub fn begin_selection(
        &mut self, start: NodeId, start_offset: usize, end: NodeId, end_offset: usize,
    ) -> Option<&SelectionSnapshot> {
        self.pending = capture(&self.dom, start, start_offset, end, end_offset);
        self.pending.as_ref()
    }

    /// Discard the pending selection.
    pub fn cancel_selection(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<&SelectionSnapshot> {
        self.pending.as_ref()
    }

    /// Persist the pending selection as a highlight.
    ///
    /// The selection is consumed on success and kept on failure so the
    /// user can retry.
    ///
    /// # Errors
    ///
    /// `Validation` when nothing is pending, otherwise whatever the
    /// service reports.
    pub async fn save_pending(&mut self) -> Result<Highlight, Error> {
        let snapshot = self
            .pending
            .as_ref()
            .ok_or_else(|| Error::Validation("no pending selection".into()))?;

        let highlight = Highlight {
            id: uuid::Uuid::new_v4().to_string(),
            text: snapshot.text.clone(),
            url: self.dom.url.clone(),
            title: truncate_chars(&self.dom.title, limits::MAX_TITLE_CHARS),
            domain: truncate_chars(&self.dom.domain(), limits::MAX_DOMAIN_CHARS),
            timestamp: now_millis(),
            page_text: Some(snapshot.context.clone()),
            text_position: snapshot.position,
        };

        let saved = self.service.save_highlight(highlight).await?;
        self.pending = None;
        Ok(saved)
    }

    /// Re-run the full mark pass: unmark everything, then locate and
    /// mark every stored highlight for this page. Returns how many
    /// were marked; highlights that fail to locate or mark are skipped.
    pub async fn refresh_marks(&mut self) -> Result<usize, Error> {
        let highlights = self.service.get_highlights().await?;

        unmark_all(&mut self.dom);
        self.markers.clear();

        let mut marked = 0;
        for highlight in &highlights {
            if highlight.url != self.dom.url {
                continue;
            }
            let hints = LocateHints {
                context: highlight.page_text.as_deref(),
                position: highlight.text_position,
            };
            let Some(location) = self.locate_cached(&highlight.text, hints) else {
                tracing::debug!(id = %highlight.id, "highlight text not found on page");
                continue;
            };
            match mark(&mut self.dom, &location, &highlight.text, &highlight.id) {
                Ok(handle) => {
                    self.markers.push(handle);
                    marked += 1;
                }
                Err(e) => tracing::debug!(id = %highlight.id, "mark failed: {e}"),
            }
        }
        Ok(marked)
    }

    /// Resolve the document position of a highlight: a rendered marker
    /// first, a fresh locate pass otherwise. `Ok(None)` when the text
    /// is not on the page or carries no rectangle.
    pub async fn scroll_to(&mut self, highlight_id: &str) -> Result<Option<TextPosition>, Error> {
        if let Some(marker) = find_marker(&self.dom, highlight_id) {
            return Ok(self.document_rect(marker));
        }

        let highlights = self.service.get_highlights().await?;
        let Some(highlight) = highlights.iter().find(|h| h.id == highlight_id) else {
            return Ok(None);
        };
        let hints =
            LocateHints { context: highlight.page_text.as_deref(), position: highlight.text_position };
        Ok(self
            .locate_cached(&highlight.text, hints)
            .and_then(|location| self.document_rect(location.start_node())))
    }

    /// Act on a `#highlight=` fragment in this page's URL: wait for the
    /// text to render (bounded retries), then mark it and return its
    /// document position. `None` when there is no fragment target or
    /// the text never appeared.
    pub async fn handle_fragment(&mut self) -> Option<TextPosition> {
        let target = parse_fragment(&self.dom.url)?;
        let hints = LocateHints { context: None, position: target.position };

        for attempt in 0..limits::FRAGMENT_RETRIES {
            if let Some(location) = self.locate_cached(&target.text, hints) {
                if let Err(e) = mark(&mut self.dom, &location, &target.text, FRAGMENT_MARKER_ID) {
                    tracing::debug!("fragment mark failed: {e}");
                }
                return self.document_rect(location.start_node());
            }
            if attempt + 1 < limits::FRAGMENT_RETRIES {
                tokio::time::sleep(limits::FRAGMENT_RETRY_DELAY).await;
            }
        }
        tracing::debug!("fragment target never rendered");
        None
    }

    /// Drop page-local caches (page teardown).
    pub fn teardown(&mut self) {
        self.cache.clear();
        self.pending = None;
        self.markers.clear();
    }

    /// Locate with the node cache in front of the document scan. A
    /// cached candidate list is distrusted as soon as any node stops
    /// containing the text or leaves the document. Detached nodes keep
    /// their old content in the arena, so the parent check is what
    /// catches a node a previous mark pass removed.
    fn locate_cached(&mut self, text: &str, hints: LocateHints<'_>) -> Option<Location> {
        let cached = self.cache.get(text, &self.dom.url).filter(|nodes| {
            !nodes.is_empty()
                && nodes.iter().all(|&n| {
                    self.dom.tree.get(n).is_some_and(|node| node.parent().is_some())
                        && self.dom.node_text(n).is_some_and(|t| t.contains(text))
                })
        });

        let candidates = match cached {
            Some(nodes) => nodes,
            None => {
                let nodes = find_text_nodes(&self.dom, text);
                self.cache.put(text, &self.dom.url, nodes.clone());
                nodes
            }
        };
        locate_among(&self.dom, &candidates, text, hints)
    }

    fn document_rect(&self, node: NodeId) -> Option<TextPosition> {
        self.dom.rect_of(node).map(|rect| self.dom.to_document_coords(rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;
    use litmark_client::{SummarizeError, SummaryBackend};
    use litmark_core::{AppConfig, StoreDb};
    use litmark_service::{spawn, spawn_with_backend};
    use std::sync::Arc;

    const URL: &str = "https://example.com/article";

    struct EchoBackend;

    #[async_trait::async_trait]
    impl SummaryBackend for EchoBackend {
        async fn summarize(&self, highlight: &Highlight) -> Result<String, SummarizeError> {
            Ok(format!("summary of {}", highlight.text))
        }
    }

    async fn service() -> ServiceHandle {
        let db = StoreDb::open_in_memory().await.unwrap();
        let (handle, _task) = spawn(db, AppConfig::default()).await;
        handle
    }

    fn article_dom() -> PageDom {
        parse_document(
            "<html><head><title>An Article</title></head>\
             <body><p>alpha beta gamma</p><p>second paragraph here</p></body></html>",
            URL,
        )
    }

    #[tokio::test]
    async fn test_select_save_persists_with_hints() {
        let mut controller = PageController::new(article_dom(), service().await);

        let node = controller.dom().text_nodes()[0];
        let snapshot = controller.begin_selection(node, 6, node, 10).unwrap();
        assert_eq!(snapshot.text, "beta");

        let saved = controller.save_pending().await.unwrap();
        assert!(!saved.id.is_empty());
        assert_eq!(saved.text, "beta");
        assert_eq!(saved.url, URL);
        assert_eq!(saved.title, "An Article");
        assert_eq!(saved.domain, "example.com");
        assert!(saved.page_text.is_some());
        assert!(controller.pending().is_none());
    }

    #[tokio::test]
    async fn test_save_without_selection_fails() {
        let mut controller = PageController::new(article_dom(), service().await);
        assert!(matches!(controller.save_pending().await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_new_selection_replaces_pending() {
        let mut controller = PageController::new(article_dom(), service().await);
        let node = controller.dom().text_nodes()[0];

        controller.begin_selection(node, 0, node, 5).unwrap();
        controller.begin_selection(node, 6, node, 10).unwrap();
        assert_eq!(controller.pending().unwrap().text, "beta");

        controller.cancel_selection();
        assert!(controller.pending().is_none());
    }

    #[tokio::test]
    async fn test_refresh_marks_round_trip() {
        let mut controller = PageController::new(article_dom(), service().await);
        let original = controller.dom().text_content();

        let node = controller.dom().text_nodes()[0];
        controller.begin_selection(node, 6, node, 10).unwrap();
        let saved = controller.save_pending().await.unwrap();

        assert_eq!(controller.refresh_marks().await.unwrap(), 1);
        assert!(find_marker(controller.dom(), &saved.id).is_some());
        assert_eq!(controller.dom().text_content(), original);

        // A second pass does not accumulate markers.
        assert_eq!(controller.refresh_marks().await.unwrap(), 1);
        assert_eq!(unmark_all(controller.dom_mut()), 1);
    }

    #[tokio::test]
    async fn test_remark_at_node_start_rescans_detached_cache_entry() {
        // Marking a match at offset 0 detaches the original text node.
        // The cached candidate list still points at it, so the second
        // pass must fall back to a fresh scan instead of splicing
        // around an orphan.
        let mut controller = PageController::new(article_dom(), service().await);
        let original = controller.dom().text_content();

        let node = controller.dom().text_nodes()[0];
        controller.begin_selection(node, 0, node, 5).unwrap();
        let saved = controller.save_pending().await.unwrap();
        assert_eq!(saved.text, "alpha");

        assert_eq!(controller.refresh_marks().await.unwrap(), 1);
        assert_eq!(controller.refresh_marks().await.unwrap(), 1);
        assert!(find_marker(controller.dom(), &saved.id).is_some());
        assert_eq!(controller.dom().text_content(), original);
    }

    #[tokio::test]
    async fn test_refresh_skips_other_pages() {
        let handle = service().await;
        let mut controller = PageController::new(article_dom(), handle.clone());

        handle
            .save_highlight(Highlight {
                id: "other".into(),
                text: "alpha beta".into(),
                url: "https://example.com/elsewhere".into(),
                title: String::new(),
                domain: "example.com".into(),
                timestamp: now_millis(),
                page_text: None,
                text_position: None,
            })
            .await
            .unwrap();

        assert_eq!(controller.refresh_marks().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_continues_past_unlocatable_text() {
        let handle = service().await;
        let mut controller = PageController::new(article_dom(), handle.clone());

        for (id, text) in [("gone", "no longer on the page"), ("there", "second paragraph")] {
            handle
                .save_highlight(Highlight {
                    id: id.into(),
                    text: text.into(),
                    url: URL.into(),
                    title: String::new(),
                    domain: "example.com".into(),
                    timestamp: now_millis(),
                    page_text: None,
                    text_position: None,
                })
                .await
                .unwrap();
        }

        assert_eq!(controller.refresh_marks().await.unwrap(), 1);
        assert!(find_marker(controller.dom(), "there").is_some());
        assert!(find_marker(controller.dom(), "gone").is_none());
    }

    #[tokio::test]
    async fn test_update_notification_drives_remark() {
        let handle = service().await;
        let mut controller = PageController::new(article_dom(), handle.clone());
        let mut updates = controller.subscribe_updates();

        handle
            .save_highlight(Highlight {
                id: "hl-n".into(),
                text: "gamma".into(),
                url: URL.into(),
                title: String::new(),
                domain: "example.com".into(),
                timestamp: now_millis(),
                page_text: None,
                text_position: None,
            })
            .await
            .unwrap();

        assert_eq!(updates.recv().await.unwrap(), Notification::HighlightsUpdated);
        assert_eq!(controller.refresh_marks().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_scroll_to_uses_rendered_marker() {
        let mut controller = PageController::new(article_dom(), service().await);

        let node = controller.dom().text_nodes()[0];
        controller.begin_selection(node, 6, node, 10).unwrap();
        let saved = controller.save_pending().await.unwrap();
        controller.refresh_marks().await.unwrap();

        let marker = find_marker(controller.dom(), &saved.id).unwrap();
        controller
            .dom_mut()
            .set_rect(marker, TextPosition { top: 80.0, left: 4.0, width: 60.0, height: 16.0 });
        controller.dom_mut().scroll_y = 20.0;

        let position = controller.scroll_to(&saved.id).await.unwrap().unwrap();
        assert_eq!(position.top, 100.0);
    }

    #[tokio::test]
    async fn test_scroll_to_unknown_id() {
        let mut controller = PageController::new(article_dom(), service().await);
        assert_eq!(controller.scroll_to("missing").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragment_target_found_and_marked() {
        let url = format!("{URL}#{}", crate::fragment::build_fragment("second paragraph", None));
        let mut dom = article_dom();
        dom.url = url;
        let second = dom.text_nodes()[1];
        dom.set_rect(second, TextPosition { top: 200.0, left: 0.0, width: 100.0, height: 16.0 });

        let mut controller = PageController::new(dom, service().await);
        let position = controller.handle_fragment().await.unwrap();
        assert_eq!(position.top, 200.0);
        assert!(find_marker(controller.dom(), FRAGMENT_MARKER_ID).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragment_gives_up_after_retries() {
        let url = format!("{URL}#{}", crate::fragment::build_fragment("never rendered text", None));
        let mut dom = article_dom();
        dom.url = url;

        let mut controller = PageController::new(dom, service().await);
        let started = tokio::time::Instant::now();
        assert!(controller.handle_fragment().await.is_none());

        let waited = started.elapsed();
        let expected = limits::FRAGMENT_RETRY_DELAY * (limits::FRAGMENT_RETRIES as u32 - 1);
        assert!(waited >= expected);
    }

    #[tokio::test]
    async fn test_saved_selection_can_be_summarized() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let (handle, _task) =
            spawn_with_backend(db, AppConfig::default(), Arc::new(EchoBackend)).await;
        let mut controller = PageController::new(article_dom(), handle.clone());

        let node = controller.dom().text_nodes()[0];
        controller.begin_selection(node, 6, node, 10).unwrap();
        let saved = controller.save_pending().await.unwrap();

        let summary = handle.summarize_highlight(saved).await.unwrap();
        assert_eq!(summary, "summary of beta");
    }

    #[tokio::test]
    async fn test_no_fragment_is_none() {
        let mut controller = PageController::new(article_dom(), service().await);
        assert!(controller.handle_fragment().await.is_none());
    }
}
