//! Storage coordinator: the single writer of persisted state.
//!
//! Every mutating operation runs its whole read-modify-write sequence
//! under one async mutex, so two interleaved callers can never both
//! read the pre-mutation list and silently lose a write. `get_all` is
//! a pure read and deliberately does not serialize against writers.
//!
//! The coordinator re-validates every record it persists, independent
//! of any validation upstream; it is the last line of defense for data
//! integrity. After every mutation it broadcasts a best-effort update
//! notification; having zero listeners is expected, not an error.

use std::collections::{BTreeMap, BTreeSet};

use litmark_core::model::{EXPORT_VERSION, now_millis, parse_record};
use litmark_core::{AppConfig, Error, ExportPayload, Highlight, ImportReport, StoreDb, SummaryEntry, limits};
use litmark_core::config::{RECOGNIZED_KEYS, load_key_file};
use tokio::sync::{Mutex, broadcast};

use crate::rpc::Notification;

/// Single-writer coordinator over the persisted store.
#[derive(Debug)]
pub struct Coordinator {
    db: StoreDb,
    config: AppConfig,
    write_lock: Mutex<()>,
    notify: broadcast::Sender<Notification>,
}

impl Coordinator {
    pub fn new(db: StoreDb, config: AppConfig, notify: broadcast::Sender<Notification>) -> Self {
        Self { db, config, write_lock: Mutex::new(()), notify }
    }

    /// Persist a new highlight at the head of the list.
    ///
    /// # Errors
    ///
    /// `Validation` if mandatory fields are missing or over limits.
    pub async fn save(&self, highlight: Highlight) -> Result<Highlight, Error> {
        highlight.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut list = self.db.read_highlights().await?;
        list.insert(0, highlight.clone());
        list.truncate(limits::MAX_HIGHLIGHTS);
        self.db.write_highlights(&list).await?;
        drop(_guard);

        self.broadcast_updated();
        Ok(highlight)
    }

    /// Delete by id. Deleting a missing id is a success (idempotent).
    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        let mut list = self.db.read_highlights().await?;
        let before = list.len();
        list.retain(|h| h.id != id);
        if list.len() != before {
            self.db.write_highlights(&list).await?;
        }
        drop(_guard);

        self.broadcast_updated();
        Ok(())
    }

    /// Remove every stored highlight.
    pub async fn clear(&self) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        self.db.write_highlights(&[]).await?;
        drop(_guard);

        self.broadcast_updated();
        Ok(())
    }

    /// Read the full list, newest first. Not serialized against writers.
    pub async fn get_all(&self) -> Result<Vec<Highlight>, Error> {
        self.db.read_highlights().await
    }

    /// Export the list as a versioned payload.
    pub async fn export(&self) -> Result<ExportPayload, Error> {
        let highlights = self.get_all().await?;
        Ok(ExportPayload { version: EXPORT_VERSION, exported_at: now_millis(), highlights })
    }

    /// Import untrusted records.
    ///
    /// Invalid records are silently dropped and counted. In merge mode
    /// existing records are kept, colliding ids are dropped as
    /// duplicates, and the rest are prepended; in replace mode the
    /// stored list is discarded wholesale. Both modes cap the result.
    pub async fn import(&self, records: &[serde_json::Value], merge: bool) -> Result<ImportReport, Error> {
        let mut report = ImportReport::default();
        let mut incoming = Vec::new();
        for record in records {
            match parse_record(record) {
                Some(h) => incoming.push(h),
                None => report.skipped_invalid += 1,
            }
        }

        let _guard = self.write_lock.lock().await;
        let mut list = if merge { self.db.read_highlights().await? } else { Vec::new() };

        if merge {
            let mut seen: BTreeSet<String> = list.iter().map(|h| h.id.clone()).collect();
            let mut fresh = Vec::new();
            for h in incoming {
                if seen.insert(h.id.clone()) {
                    fresh.push(h);
                } else {
                    report.skipped_duplicates += 1;
                }
            }
            report.imported = fresh.len();
            fresh.extend(list);
            list = fresh;
        } else {
            report.imported = incoming.len();
            list = incoming;
        }

        list.truncate(limits::MAX_HIGHLIGHTS);
        self.db.write_highlights(&list).await?;
        drop(_guard);

        self.broadcast_updated();
        Ok(report)
    }

    /// Read a cached summary if present and within its TTL.
    ///
    /// Expired entries read as absent and are lazily removed.
    pub async fn cached_summary(&self, key: &str) -> Result<Option<String>, Error> {
        let map = self.db.read_summaries().await?;
        match map.get(key) {
            Some(entry) if !summary_expired(entry) => Ok(Some(entry.summary.clone())),
            Some(_) => {
                let _guard = self.write_lock.lock().await;
                let mut map = self.db.read_summaries().await?;
                map.remove(key);
                self.db.write_summaries(&map).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Cache a summary, evicting oldest-timestamp buckets on overflow.
    pub async fn put_summary(&self, key: &str, summary: &str) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.db.read_summaries().await?;
        map.insert(key.to_string(), SummaryEntry { summary: summary.to_string(), timestamp: now_millis() });
        evict_oldest_buckets(&mut map, limits::SUMMARY_CACHE_CAP);
        self.db.write_summaries(&map).await
    }

    /// Drop every expired summary entry. Returns the number removed.
    pub async fn sweep_summaries(&self) -> Result<usize, Error> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.db.read_summaries().await?;
        let before = map.len();
        map.retain(|_, entry| !summary_expired(entry));
        let removed = before - map.len();
        if removed > 0 {
            self.db.write_summaries(&map).await?;
        }
        Ok(removed)
    }

    /// Read persisted settings, bootstrapping from the bundled key file
    /// when settings are empty. Once copied, the file is never read
    /// again because settings are no longer empty.
    pub async fn get_config(&self) -> Result<BTreeMap<String, String>, Error> {
        let _guard = self.write_lock.lock().await;
        let settings = self.db.read_settings().await?;
        if !settings.is_empty() {
            return Ok(settings);
        }

        let Some(key_file) = &self.config.key_file else {
            return Ok(settings);
        };
        match load_key_file(key_file) {
            Ok(from_file) if !from_file.is_empty() => {
                self.db.write_settings(&from_file).await?;
                tracing::info!(path = %key_file.display(), "bootstrapped settings from key file");
                Ok(from_file)
            }
            Ok(_) => Ok(settings),
            Err(e) => {
                tracing::debug!("key file unavailable: {e}");
                Ok(settings)
            }
        }
    }

    /// Persist the recognized option set; unknown keys are dropped.
    pub async fn save_config(&self, config: BTreeMap<String, String>) -> Result<(), Error> {
        let filtered: BTreeMap<String, String> = config
            .into_iter()
            .filter(|(k, _)| RECOGNIZED_KEYS.contains(&k.as_str()))
            .collect();

        let _guard = self.write_lock.lock().await;
        self.db.write_settings(&filtered).await
    }

    /// Effective configuration: baseline layered under persisted settings.
    pub async fn resolved_config(&self) -> Result<AppConfig, Error> {
        let mut config = self.config.clone();
        let settings = self.get_config().await?;
        config.apply_settings(&settings);
        Ok(config)
    }

    fn broadcast_updated(&self) {
        // Zero receivers just means no page is open.
        let _ = self.notify.send(Notification::HighlightsUpdated);
    }
}

fn summary_expired(entry: &SummaryEntry) -> bool {
    let age = now_millis().saturating_sub(entry.timestamp);
    age >= limits::SUMMARY_CACHE_TTL.as_millis() as i64
}

/// Evict whole oldest-timestamp buckets until the map fits `cap`.
///
/// Entries written in the same millisecond age out together; this can
/// remove more than strictly necessary and that is the intended policy.
fn evict_oldest_buckets(map: &mut BTreeMap<String, SummaryEntry>, cap: usize) {
    while map.len() > cap {
        let Some(oldest) = map.values().map(|e| e.timestamp).min() else {
            return;
        };
        map.retain(|_, entry| entry.timestamp != oldest);
    }
}
