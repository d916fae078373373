//! Tolerant decoding of the `meta` feed
//!
//! The feed is produced by a serializer that occasionally emits trailing
//! commas and repeats object keys. Decoding first tries a strict typed parse;
//! if that fails the text is repaired and decoded again through an untyped
//! [`Value`], which keeps the last occurrence of a repeated key.

use serde_json::Value;
use tracing::debug;

use super::models::MetaFeed;
use crate::{Error, Result};

/// Decode the raw `meta` response, repairing it if the strict parse fails
///
/// # Errors
///
/// Returns [`Error::MetadataParse`] when the repaired text still cannot be
/// decoded.
pub fn parse_meta_feed(raw: &[u8]) -> Result<MetaFeed> {
    let raw = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw);

    let direct = match serde_json::from_slice::<MetaFeed>(raw) {
        Ok(feed) => return Ok(feed),
        Err(e) => e,
    };
    debug!(error = %direct, "Strict metadata decode failed, attempting repair");

    let text = std::str::from_utf8(raw)
        .map_err(|e| Error::MetadataParse(format!("Metadata feed is not UTF-8: {e}")))?;
    let repaired = strip_trailing_commas(text);

    let value: Value = serde_json::from_str(&repaired)
        .map_err(|e| Error::MetadataParse(format!("Metadata feed is not valid JSON: {e}")))?;
    serde_json::from_value(value)
        .map_err(|e| Error::MetadataParse(format!("Metadata feed has unexpected shape: {e}")))
}

/// Remove commas that directly precede a closing `}` or `]`, ignoring string contents
pub(crate) fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
                if !matches!(next, Some('}' | ']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}
