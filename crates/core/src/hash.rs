//! Deterministic fingerprints for the summary cache.

use crate::limits::FINGERPRINT_TEXT_CHARS;
use crate::model::truncate_chars;
use sha2::{Digest, Sha256};

/// Compute the cache fingerprint for a highlight.
///
/// Keyed on the text prefix, URL, and title so the same selection on
/// the same page always maps to one summary cache slot and one
/// in-flight request.
pub fn fingerprint(text: &str, url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(truncate_chars(text, FINGERPRINT_TEXT_CHARS).as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(title.as_bytes());
    hex::encode(hasher.finalize())
}
