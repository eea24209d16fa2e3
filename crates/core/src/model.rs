//! Highlight data model and the validation boundary.
//!
//! A [`Highlight`] is the durable unit: the exact selected text plus
//! page metadata and two advisory relocation hints (surrounding context
//! and a bounding box). The same validation predicate runs at the save
//! and import boundaries; the storage coordinator re-applies it as the
//! last line of defense.

use crate::limits;
use serde::{Deserialize, Serialize};

/// Bounding box in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextPosition {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl TextPosition {
    /// Euclidean distance between the top-left corners of two boxes.
    pub fn distance_to(&self, other: &TextPosition) -> f64 {
        let dt = self.top - other.top;
        let dl = self.left - other.left;
        (dt * dt + dl * dl).sqrt()
    }
}

/// A persisted highlight record.
///
/// `id`, `text`, `url`, and `timestamp` are mandatory and immutable;
/// `page_text` and `text_position` are disambiguation hints consumed
/// only at marking/scroll time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub text: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub domain: String,
    /// Creation time, epoch millis. Orders the collection newest-first.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_position: Option<TextPosition>,
}

impl Highlight {
    /// Validate the mandatory fields against the shared limits.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.id.is_empty() {
            return Err(crate::Error::Validation("id must be a non-empty string".into()));
        }
        let text_chars = self.text.chars().count();
        if text_chars == 0 {
            return Err(crate::Error::Validation("text must be a non-empty string".into()));
        }
        if text_chars > limits::MAX_TEXT_CHARS {
            return Err(crate::Error::Validation(format!(
                "text exceeds {} characters",
                limits::MAX_TEXT_CHARS
            )));
        }
        if self.url.is_empty() {
            return Err(crate::Error::Validation("url must be a non-empty string".into()));
        }
        if self.url.chars().count() > limits::MAX_URL_CHARS {
            return Err(crate::Error::Validation(format!("url exceeds {} characters", limits::MAX_URL_CHARS)));
        }
        if self.timestamp <= 0 {
            return Err(crate::Error::Validation("timestamp must be a positive number".into()));
        }
        Ok(())
    }
}

/// Parse one untrusted import record.
///
/// Anything that fails the field checks is rejected (the caller counts
/// it as skipped-invalid). Unknown fields are ignored; `title` and
/// `domain` are informational and clamped rather than rejected.
pub fn parse_record(value: &serde_json::Value) -> Option<Highlight> {
    let obj = value.as_object()?;

    let id = obj.get("id")?.as_str()?;
    let text = obj.get("text")?.as_str()?;
    let url = obj.get("url")?.as_str()?;
    let timestamp = obj.get("timestamp")?.as_i64()?;

    let highlight = Highlight {
        id: id.to_string(),
        text: text.to_string(),
        url: url.to_string(),
        title: truncate_chars(
            obj.get("title").and_then(|v| v.as_str()).unwrap_or_default(),
            limits::MAX_TITLE_CHARS,
        ),
        domain: truncate_chars(
            obj.get("domain").and_then(|v| v.as_str()).unwrap_or_default(),
            limits::MAX_DOMAIN_CHARS,
        ),
        timestamp,
        page_text: obj.get("pageText").and_then(|v| v.as_str()).map(String::from),
        text_position: obj
            .get("textPosition")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
    };

    highlight.validate().ok()?;
    Some(highlight)
}

/// Cached summary value plus its write time (epoch millis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub summary: String,
    pub timestamp: i64,
}

/// Counts reported by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub skipped_invalid: usize,
}

/// Export file payload version.
pub const EXPORT_VERSION: u32 = 1;

/// Versioned export payload. Import accepts this shape or a bare array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub version: u32,
    pub exported_at: i64,
    pub highlights: Vec<Highlight>,
}

/// Current wall-clock time as epoch millis.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Truncate a string to at most `max` characters, on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
