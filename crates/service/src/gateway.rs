//! Summarization gateway: cache, in-flight dedup, admission control.
//!
//! Per cache key the state machine is absent → pending (one in-flight
//! call) → cached (TTL window) → absent. Concurrent callers for the
//! same key while pending all await the single shared future; the
//! pending future is the lock token. Admission is checked only when a
//! new call would actually be issued; a denied caller fails fast with
//! the remaining wait and nothing is queued. Failed calls are never
//! cached and never consume quota beyond the one attempt counted.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use litmark_client::{SlidingWindowLimiter, SummarizeClient, SummarizeConfig, SummarizeError, SummaryBackend};
use litmark_core::hash::fingerprint;
use litmark_core::{Error, Highlight};
use tokio::sync::Mutex;

use crate::coordinator::Coordinator;

type SharedCall = Shared<BoxFuture<'static, Result<String, SummarizeError>>>;

/// Request-deduplicating, rate-limited, cached summarization front.
pub struct SummaryGateway {
    coordinator: Arc<Coordinator>,
    limiter: SlidingWindowLimiter,
    inflight: Arc<Mutex<HashMap<String, SharedCall>>>,
    backend: Option<Arc<dyn SummaryBackend>>,
}

impl SummaryGateway {
    /// Gateway backed by a real HTTP client built per call from the
    /// resolved configuration.
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            coordinator,
            limiter: SlidingWindowLimiter::default(),
            inflight: Arc::new(Mutex::new(HashMap::new())),
            backend: None,
        }
    }

    /// Gateway with an injected backend (tests, alternative providers).
    pub fn with_backend(coordinator: Arc<Coordinator>, backend: Arc<dyn SummaryBackend>) -> Self {
        Self {
            coordinator,
            limiter: SlidingWindowLimiter::default(),
            inflight: Arc::new(Mutex::new(HashMap::new())),
            backend: Some(backend),
        }
    }

    /// Summarize one highlight.
    ///
    /// # Errors
    ///
    /// `RateLimited` with the remaining wait when admission is denied,
    /// `ConfigMissing` when no credential resolves, `Upstream` or
    /// `MalformedResponse` when the call fails.
    pub async fn summarize(&self, highlight: &Highlight) -> Result<String, Error> {
        highlight.validate()?;
        let key = fingerprint(&highlight.text, &highlight.url, &highlight.title);

        if let Some(summary) = self.coordinator.cached_summary(&key).await? {
            tracing::debug!(%key, "summary cache hit");
            return Ok(summary);
        }

        let call = {
            let mut inflight = self.inflight.lock().await;
            if let Some(call) = inflight.get(&key) {
                tracing::debug!(%key, "joining in-flight summarization");
                call.clone()
            } else {
                let backend = self.resolve_backend().await?;

                self.limiter
                    .try_acquire()
                    .await
                    .map_err(|retry_after| Error::RateLimited { retry_after_secs: retry_after.as_secs().max(1) })?;

                let coordinator = self.coordinator.clone();
                let inflight_map = self.inflight.clone();
                let h = highlight.clone();
                let k = key.clone();
                let call: SharedCall = async move {
                    let result = backend.summarize(&h).await;
                    if let Ok(summary) = &result
                        && let Err(e) = coordinator.put_summary(&k, summary).await
                    {
                        tracing::warn!("failed to cache summary: {e}");
                    }
                    inflight_map.lock().await.remove(&k);
                    result
                }
                .boxed()
                .shared();

                inflight.insert(key.clone(), call.clone());
                call
            }
        };

        match call.await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::warn!(%key, error = %e, "summarization failed");
                Err(Error::from(e))
            }
        }
    }

    async fn resolve_backend(&self) -> Result<Arc<dyn SummaryBackend>, Error> {
        if let Some(backend) = &self.backend {
            return Ok(backend.clone());
        }
        let config = self.coordinator.resolved_config().await?;
        let client_config = SummarizeConfig::from_app_config(&config).map_err(Error::from)?;
        let client = SummarizeClient::new(client_config).map_err(Error::from)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litmark_core::model::now_millis;
    use litmark_core::{AppConfig, StoreDb, SummaryEntry, limits};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::broadcast;

    struct StubBackend {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl StubBackend {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0), delay: Duration::ZERO, fail: false }
        }

        fn slow() -> Self {
            Self { calls: AtomicUsize::new(0), delay: Duration::from_millis(100), fail: false }
        }

        fn failing() -> Self {
            Self { calls: AtomicUsize::new(0), delay: Duration::ZERO, fail: true }
        }

        fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SummaryBackend for StubBackend {
        async fn summarize(&self, highlight: &Highlight) -> Result<String, SummarizeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(SummarizeError::HttpError { status: 500 });
            }
            Ok(format!("summary of {}", highlight.id))
        }
    }

    fn make_highlight(id: &str) -> Highlight {
        Highlight {
            id: id.to_string(),
            text: format!("text {id}"),
            url: "https://example.com".into(),
            title: "T".into(),
            domain: "example.com".into(),
            timestamp: 1,
            page_text: None,
            text_position: None,
        }
    }

    async fn make_coordinator() -> Arc<Coordinator> {
        let db = StoreDb::open_in_memory().await.unwrap();
        let (notify, _) = broadcast::channel(16);
        Arc::new(Coordinator::new(db, AppConfig::default(), notify))
    }

    #[tokio::test]
    async fn test_config_missing_fails_before_any_call() {
        let gateway = SummaryGateway::new(make_coordinator().await);
        let result = gateway.summarize(&make_highlight("h")).await;
        assert!(matches!(result, Err(Error::ConfigMissing(_))));
    }

    #[tokio::test]
    async fn test_single_call_and_cache() {
        let coordinator = make_coordinator().await;
        let backend = Arc::new(StubBackend::new());
        let gateway = SummaryGateway::with_backend(coordinator, backend.clone());

        let h = make_highlight("h1");
        let first = gateway.summarize(&h).await.unwrap();
        let second = gateway.summarize(&h).await.unwrap();

        assert_eq!(first, "summary of h1");
        assert_eq!(first, second);
        // Second answer came from the cache.
        assert_eq!(backend.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_call() {
        let coordinator = make_coordinator().await;
        let backend = Arc::new(StubBackend::slow());
        let gateway = Arc::new(SummaryGateway::with_backend(coordinator, backend.clone()));

        let h = make_highlight("h1");
        let g1 = gateway.clone();
        let g2 = gateway.clone();
        let h1 = h.clone();
        let h2 = h.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { g1.summarize(&h1).await }),
            tokio::spawn(async move { g2.summarize(&h2).await }),
        );

        let a = a.unwrap().unwrap();
        let b = b.unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(backend.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_admits_five_then_denies() {
        let coordinator = make_coordinator().await;
        let backend = Arc::new(StubBackend::new());
        let gateway = SummaryGateway::with_backend(coordinator, backend.clone());

        for i in 0..limits::RATE_LIMIT_CALLS {
            gateway.summarize(&make_highlight(&format!("h{i}"))).await.unwrap();
        }
        let denied = gateway.summarize(&make_highlight("h-over")).await;
        assert!(matches!(denied, Err(Error::RateLimited { retry_after_secs }) if retry_after_secs > 0));
        assert_eq!(backend.count(), limits::RATE_LIMIT_CALLS);

        // After the window elapses a fresh call is admitted.
        tokio::time::advance(limits::RATE_LIMIT_WINDOW + Duration::from_secs(1)).await;
        gateway.summarize(&make_highlight("h-later")).await.unwrap();
    }

    #[tokio::test]
    async fn test_cached_hit_skips_rate_limit_and_backend() {
        let coordinator = make_coordinator().await;
        let h = make_highlight("h1");
        let key = fingerprint(&h.text, &h.url, &h.title);
        coordinator.put_summary(&key, "pre-seeded").await.unwrap();

        let backend = Arc::new(StubBackend::new());
        let gateway = SummaryGateway::with_backend(coordinator, backend.clone());
        assert_eq!(gateway.summarize(&h).await.unwrap(), "pre-seeded");
        assert_eq!(backend.count(), 0);
    }

    #[tokio::test]
    async fn test_expired_cache_triggers_fresh_call() {
        let h = make_highlight("h1");
        let key = fingerprint(&h.text, &h.url, &h.title);

        let mut map = BTreeMap::new();
        let stale = now_millis() - limits::SUMMARY_CACHE_TTL.as_millis() as i64 - 1;
        map.insert(key, SummaryEntry { summary: "stale".into(), timestamp: stale });
        // Reach past the coordinator on purpose to plant an aged entry.
        let db = StoreDb::open_in_memory().await.unwrap();
        db.write_summaries(&map).await.unwrap();
        let (notify, _) = broadcast::channel(16);
        let coordinator = Arc::new(Coordinator::new(db, AppConfig::default(), notify));

        let backend = Arc::new(StubBackend::new());
        let gateway = SummaryGateway::with_backend(coordinator, backend.clone());
        let fresh = gateway.summarize(&h).await.unwrap();
        assert_eq!(fresh, "summary of h1");
        assert_eq!(backend.count(), 1);
    }

    #[tokio::test]
    async fn test_failed_call_not_cached() {
        let coordinator = make_coordinator().await;
        let backend = Arc::new(StubBackend::failing());
        let gateway = SummaryGateway::with_backend(coordinator.clone(), backend.clone());

        let h = make_highlight("h1");
        assert!(matches!(gateway.summarize(&h).await, Err(Error::Upstream(_))));

        let key = fingerprint(&h.text, &h.url, &h.title);
        assert!(coordinator.cached_summary(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_registry_cleared_after_completion() {
        let coordinator = make_coordinator().await;
        let backend = Arc::new(StubBackend::new());
        let gateway = SummaryGateway::with_backend(coordinator, backend.clone());

        let h = make_highlight("h1");
        gateway.summarize(&h).await.unwrap();
        assert!(gateway.inflight.lock().await.is_empty());
    }
}
