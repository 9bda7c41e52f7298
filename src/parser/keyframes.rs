use codemap::Span;

use crate::error::{SassError, SassErrorKind, SassResult};

/// A `@keyframes` block's selector is a comma-separated list of
/// percentages (`0%, 50%`) or the keywords `from`/`to`, never an ordinary
/// CSS selector — parsed separately so `from`/`to` aren't mistaken for
/// type selectors (§4.C `KeyframeSelectorParser`).
pub(crate) fn parse_keyframe_selector(text: &str, span: Span) -> SassResult<String> {
    let mut parts = Vec::new();
    for raw in text.split(',') {
        let raw = raw.trim();
        match raw {
            "from" => parts.push("0%".to_string()),
            "to" => parts.push("100%".to_string()),
            _ if raw.ends_with('%') && raw[..raw.len() - 1].parse::<f64>().is_ok() => {
                parts.push(raw.to_string());
            }
            _ => {
                return Err(SassError::new(
                    SassErrorKind::Parse,
                    format!("Expected \"from\", \"to\", or a percentage, found \"{}\".", raw),
                    span,
                ));
            }
        }
    }
    Ok(parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        let mut map = codemap::CodeMap::new();
        map.add_file("t".into(), "x".into()).span
    }

    #[test]
    fn from_and_to_normalize_to_percentages() {
        assert_eq!(parse_keyframe_selector("from, to", span()).unwrap(), "0%, 100%");
    }

    #[test]
    fn invalid_keyword_errors() {
        assert!(parse_keyframe_selector("middle", span()).is_err());
    }
}
