//! Bundled KEY=VALUE credential file.
//!
//! Ships alongside the binary as a plain-text fallback for first-run
//! configuration. Lines starting with `#` are comments. Only the
//! recognized option set is read; everything else is ignored. Once the
//! coordinator copies the values into persisted settings the file is
//! never consulted again.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::ConfigError;

/// The recognized option set.
pub const RECOGNIZED_KEYS: &[&str] =
    &["OPENAI_API_KEY", "AI_MODEL", "AI_MAX_TOKENS", "AI_TEMPERATURE", "AI_TIMEOUT"];

/// Parse KEY=VALUE lines, keeping only recognized keys.
pub fn parse_key_file(contents: &str) -> BTreeMap<String, String> {
    let mut settings = BTreeMap::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if RECOGNIZED_KEYS.contains(&key) && !value.is_empty() {
            settings.insert(key.to_string(), value.to_string());
        }
    }

    settings
}

/// Read and parse the bundled key file.
///
/// # Errors
///
/// Returns `ConfigError::LoadFailed` if the file cannot be read.
pub fn load_key_file(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::LoadFailed(format!("{}: {e}", path.display())))?;
    Ok(parse_key_file(&contents))
}
