//! Reply parsing: pull the JSON value out of the model's answer.
//!
//! Models wrap their JSON in ```` ```json ```` fences, prefix it with a
//! sentence, or leave a trailing comma behind. Rather than trimming a fixed
//! fence marker, [`parse_reply`] scans for the first *balanced* JSON object
//! or array, skipping brackets that appear inside string literals, and parses
//! that span. Surrounding markup of any shape is ignored.
//!
//! Order of attempts for each candidate span:
//! 1. strict `serde_json` parse
//! 2. parse after removing trailing commas before `}` / `]`
//!
//! Only top-level spans are candidates. A span that fails to parse is
//! skipped as a whole, never searched for nested values, and an opener that
//! never balances (a reply cut off at the token ceiling) ends the scan. A
//! broken reply is therefore an error, never a fragment of itself.
//!
//! If no candidate parses, the strict error for the first candidate is
//! reported. If there is no candidate at all, the error for the whole text is
//! reported.

use crate::error::DocExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use tracing::debug;

static RE_TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

/// Parse the JSON value embedded in a model reply.
pub fn parse_reply(text: &str) -> Result<Value, DocExtractError> {
    let cleaned = remove_invisible_chars(text);
    let mut first_err: Option<serde_json::Error> = None;
    let mut from = 0;

    while let Some((start, span)) = next_balanced_span(&cleaned, from) {
        match parse_span(span) {
            Ok(v) => {
                debug!("Parsed JSON reply span at byte {} ({} bytes)", start, span.len());
                return Ok(v);
            }
            Err(e) => {
                first_err.get_or_insert(e);
                from = start + span.len();
            }
        }
    }

    let err = match first_err {
        Some(e) => e,
        None => match serde_json::from_str::<Value>(cleaned.trim()) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        },
    };
    Err(DocExtractError::InvalidJson {
        detail: err.to_string(),
    })
}

fn parse_span(span: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str::<Value>(span).or_else(|strict_err| {
        let repaired = strip_trailing_commas(span);
        if let Cow::Owned(fixed) = &repaired {
            if let Ok(v) = serde_json::from_str::<Value>(fixed) {
                debug!("Parsed JSON reply after trailing-comma repair");
                return Ok(v);
            }
        }
        Err(strict_err)
    })
}

/// Find the next balanced `{…}` or `[…]` starting at or after byte `from`.
///
/// Returns the byte offset of the opener and the span including both
/// brackets. `None` when there is no further opener, or when the next one
/// never balances (or closes with the wrong kind).
pub fn next_balanced_span(text: &str, from: usize) -> Option<(usize, &str)> {
    let bytes = text.as_bytes();
    let open = bytes.get(from..)?.iter().position(|&b| b == b'{' || b == b'[')? + from;
    let end = balanced_end(bytes, open)?;
    Some((open, &text[open..=end]))
}

/// Index of the bracket closing the one at `open`, honouring string literals.
fn balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_trailing_commas(input: &str) -> Cow<'_, str> {
    RE_TRAILING_COMMA.replace_all(input, "$1")
}

fn remove_invisible_chars(input: &str) -> Cow<'_, str> {
    const INVISIBLE: [char; 5] = ['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'];
    if input.contains(INVISIBLE) {
        Cow::Owned(input.replace(INVISIBLE, ""))
    } else {
        Cow::Borrowed(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_json_reply() {
        let v = parse_reply("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(v, json!({"a": 1}));
    }

    #[test]
    fn bare_json_reply() {
        assert_eq!(parse_reply("  {\"a\": [1, 2]}  ").unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn prose_around_json() {
        let text = "Sure! Here is the data:\n```\n{\"total_amount\": 100}\n```\nLet me know.";
        assert_eq!(parse_reply(text).unwrap(), json!({"total_amount": 100}));
    }

    #[test]
    fn brackets_inside_strings_ignored() {
        let text = r#"{"note": "see } and ] here", "n": 2} trailing"#;
        assert_eq!(
            parse_reply(text).unwrap(),
            json!({"note": "see } and ] here", "n": 2})
        );
    }

    #[test]
    fn escaped_quote_inside_string() {
        let text = r#"{"q": "say \"hi\" {", "n": 1}"#;
        assert_eq!(parse_reply(text).unwrap()["n"], 1);
    }

    #[test]
    fn skips_non_json_bracket_group() {
        let text = "Fields [see below]: {\"a\": 1}";
        assert_eq!(parse_reply(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn trailing_comma_repaired() {
        let text = "```json\n{\"items\": [{\"x\": 1},], \"b\": 2,}\n```";
        assert_eq!(parse_reply(text).unwrap(), json!({"items": [{"x": 1}], "b": 2}));
    }

    #[test]
    fn bom_stripped() {
        assert_eq!(parse_reply("\u{FEFF}{\"a\":1}").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn non_json_reply_is_error() {
        let err = parse_reply("I could not read this document.").unwrap_err();
        match err {
            DocExtractError::InvalidJson { detail } => assert!(!detail.is_empty()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unbalanced_reply_is_error() {
        assert!(parse_reply("```json\n{\"a\": 1\n```").is_err());
    }

    #[test]
    fn truncated_reply_is_error() {
        let text = r#"{"purchase_order_number": "PO-1", "supplier": {"name": "ACME"}, "items": [{"item_description": "A""#;
        assert!(matches!(parse_reply(text), Err(DocExtractError::InvalidJson { .. })));
    }

    #[test]
    fn malformed_outer_object_is_error() {
        let text = "```json\n{\"purchase_order_number\": \"PO-1\", \
                    \"items\": [{\"item_description\": \"A\"}], total_amount: 100}\n```";
        assert!(matches!(parse_reply(text), Err(DocExtractError::InvalidJson { .. })));
    }

    #[test]
    fn failed_span_skipped_whole() {
        let text = "[not {\"json\": 1}] then {\"a\": 2}";
        assert_eq!(parse_reply(text).unwrap(), json!({"a": 2}));
    }

    #[test]
    fn unbalanced_opener_ends_scan() {
        assert!(next_balanced_span("{\"a\": {\"b\": 1}", 0).is_none());
    }

    #[test]
    fn balanced_span_offsets() {
        let (start, span) = next_balanced_span("ab {x} [y]", 0).unwrap();
        assert_eq!((start, span), (3, "{x}"));
        let (start, span) = next_balanced_span("ab {x} [y]", 4).unwrap();
        assert_eq!((start, span), (7, "[y]"));
    }
}
