//! Typed document access over the kv table.
//!
//! Persisted state is two JSON documents plus settings and a version
//! marker. A document that fails to parse is treated as absent with a
//! warning rather than poisoning every subsequent operation.

use std::collections::BTreeMap;

use super::connection::StoreDb;
use crate::Error;
use crate::model::{Highlight, SummaryEntry};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Key under which the highlight list is stored.
pub const KEY_HIGHLIGHTS: &str = "highlights";
/// Key under which the summary cache map is stored.
pub const KEY_SUMMARY_CACHE: &str = "summaryCache";
/// Key under which persisted settings are stored.
pub const KEY_SETTINGS: &str = "settings";
/// Key under which the best-effort version marker is stored.
pub const KEY_VERSION: &str = "version";

/// Current store format version, stamped at startup.
pub const STORE_VERSION: &str = "1";

impl StoreDb {
    /// Get a raw value by key.
    ///
    /// Returns None if the key doesn't exist.
    pub async fn get_value(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;

                let result = stmt.query_row(params![key], |row| row.get(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a value.
    pub async fn put_value(&self, key: &str, value: String) -> Result<(), Error> {
        let key = key.to_string();
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                         value = excluded.value,
                         updated_at = excluded.updated_at",
                    params![key, value, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Read the persisted highlight list (newest first).
    ///
    /// An absent or unparseable document reads as an empty list.
    pub async fn read_highlights(&self) -> Result<Vec<Highlight>, Error> {
        match self.get_value(KEY_HIGHLIGHTS).await? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(list) => Ok(list),
                Err(e) => {
                    tracing::warn!("discarding unparseable highlight list: {e}");
                    Ok(Vec::new())
                }
            },
            None => Ok(Vec::new()),
        }
    }

    /// Replace the persisted highlight list.
    pub async fn write_highlights(&self, highlights: &[Highlight]) -> Result<(), Error> {
        let json = serde_json::to_string(highlights)
            .map_err(|e| Error::Validation(format!("unserializable highlight list: {e}")))?;
        self.put_value(KEY_HIGHLIGHTS, json).await
    }

    /// Read the persisted summary cache map.
    pub async fn read_summaries(&self) -> Result<BTreeMap<String, SummaryEntry>, Error> {
        match self.get_value(KEY_SUMMARY_CACHE).await? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(map) => Ok(map),
                Err(e) => {
                    tracing::warn!("discarding unparseable summary cache: {e}");
                    Ok(BTreeMap::new())
                }
            },
            None => Ok(BTreeMap::new()),
        }
    }

    /// Replace the persisted summary cache map.
    pub async fn write_summaries(&self, summaries: &BTreeMap<String, SummaryEntry>) -> Result<(), Error> {
        let json = serde_json::to_string(summaries)
            .map_err(|e| Error::Validation(format!("unserializable summary cache: {e}")))?;
        self.put_value(KEY_SUMMARY_CACHE, json).await
    }

    /// Read persisted settings.
    pub async fn read_settings(&self) -> Result<BTreeMap<String, String>, Error> {
        match self.get_value(KEY_SETTINGS).await? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(map) => Ok(map),
                Err(e) => {
                    tracing::warn!("discarding unparseable settings: {e}");
                    Ok(BTreeMap::new())
                }
            },
            None => Ok(BTreeMap::new()),
        }
    }

    /// Replace persisted settings.
    pub async fn write_settings(&self, settings: &BTreeMap<String, String>) -> Result<(), Error> {
        let json = serde_json::to_string(settings)
            .map_err(|e| Error::Validation(format!("unserializable settings: {e}")))?;
        self.put_value(KEY_SETTINGS, json).await
    }

    /// Check the version marker and stamp the current version.
    ///
    /// Best-effort: an unexpected marker is logged, never fatal.
    pub async fn check_version(&self) -> Result<(), Error> {
        if let Some(found) = self.get_value(KEY_VERSION).await?
            && found != STORE_VERSION
        {
            tracing::warn!(found, expected = STORE_VERSION, "store version marker mismatch");
        }
        self.put_value(KEY_VERSION, STORE_VERSION.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_highlight(id: &str) -> Highlight {
        Highlight {
            id: id.to_string(),
            text: "hello world".into(),
            url: "https://example.com".into(),
            title: "Example".into(),
            domain: "example.com".into(),
            timestamp: 1_700_000_000_000,
            page_text: None,
            text_position: None,
        }
    }

    #[tokio::test]
    async fn test_get_missing_value() {
        let db = StoreDb::open_in_memory().await.unwrap();
        assert!(db.get_value("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_and_get_value() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.put_value("k", "v1".into()).await.unwrap();
        db.put_value("k", "v2".into()).await.unwrap();
        assert_eq!(db.get_value("k").await.unwrap().unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_highlights_round_trip() {
        let db = StoreDb::open_in_memory().await.unwrap();
        assert!(db.read_highlights().await.unwrap().is_empty());

        let list = vec![make_highlight("a"), make_highlight("b")];
        db.write_highlights(&list).await.unwrap();
        assert_eq!(db.read_highlights().await.unwrap(), list);
    }

    #[tokio::test]
    async fn test_corrupt_highlights_read_as_empty() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.put_value(KEY_HIGHLIGHTS, "not json".into()).await.unwrap();
        assert!(db.read_highlights().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summaries_round_trip() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let mut map = BTreeMap::new();
        map.insert("key1".to_string(), SummaryEntry { summary: "short".into(), timestamp: 42 });
        db.write_summaries(&map).await.unwrap();
        assert_eq!(db.read_summaries().await.unwrap(), map);
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let mut settings = BTreeMap::new();
        settings.insert("AI_MODEL".to_string(), "gpt-4o".to_string());
        db.write_settings(&settings).await.unwrap();
        assert_eq!(db.read_settings().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_check_version_stamps() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.check_version().await.unwrap();
        assert_eq!(db.get_value(KEY_VERSION).await.unwrap().unwrap(), STORE_VERSION);

        // A stale marker is tolerated and overwritten.
        db.put_value(KEY_VERSION, "0".into()).await.unwrap();
        db.check_version().await.unwrap();
        assert_eq!(db.get_value(KEY_VERSION).await.unwrap().unwrap(), STORE_VERSION);
    }
}
