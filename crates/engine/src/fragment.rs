//! Navigation fragment protocol.
//!
//! `#highlight=<urlencoded text>&pos=<urlencoded JSON position>` lets a
//! link target a highlight on another page; the receiving page decodes
//! it and waits for the text to render before scrolling to it.

use litmark_core::TextPosition;
use url::Url;
use url::form_urlencoded;

/// Decoded fragment target.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentTarget {
    pub text: String,
    pub position: Option<TextPosition>,
}

/// Decode a highlight fragment from a full URL. `None` when there is
/// no fragment, no `highlight` key, or the text is empty; a malformed
/// `pos` value is dropped rather than failing the whole target.
pub fn parse_fragment(url: &str) -> Option<FragmentTarget> {
    let parsed = Url::parse(url).ok()?;
    let fragment = parsed.fragment()?;

    let mut text = None;
    let mut position = None;
    for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "highlight" if !value.is_empty() => text = Some(value.into_owned()),
            "pos" => position = serde_json::from_str(&value).ok(),
            _ => {}
        }
    }

    text.map(|text| FragmentTarget { text, position })
}

/// Encode a highlight fragment (without the leading `#`).
pub fn build_fragment(text: &str, position: Option<&TextPosition>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("highlight", text);
    if let Some(position) = position
        && let Ok(json) = serde_json::to_string(position)
    {
        serializer.append_pair("pos", &json);
    }
    serializer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_with_position() {
        let position = TextPosition { top: 120.5, left: 8.0, width: 200.0, height: 18.0 };
        let fragment = build_fragment("some saved text", Some(&position));
        let url = format!("https://example.com/page#{fragment}");

        let target = parse_fragment(&url).unwrap();
        assert_eq!(target.text, "some saved text");
        assert_eq!(target.position, Some(position));
    }

    #[test]
    fn test_text_only() {
        let target = parse_fragment("https://example.com/#highlight=plain%20text").unwrap();
        assert_eq!(target.text, "plain text");
        assert!(target.position.is_none());
    }

    #[test]
    fn test_no_fragment() {
        assert!(parse_fragment("https://example.com/page").is_none());
    }

    #[test]
    fn test_unrelated_fragment() {
        assert!(parse_fragment("https://example.com/page#section-2").is_none());
    }

    #[test]
    fn test_malformed_pos_dropped() {
        let target = parse_fragment("https://example.com/#highlight=ok&pos=not-json").unwrap();
        assert_eq!(target.text, "ok");
        assert!(target.position.is_none());
    }

    #[test]
    fn test_empty_highlight_value() {
        assert!(parse_fragment("https://example.com/#highlight=").is_none());
    }
}
