//! Field, include and order-by formatting

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

static INCLUDE_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z.]+$").expect("include pattern is valid"));

static ORDER_DIRECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(asc|desc)\s*$").expect("direction pattern is valid"));

static ORDER_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("order field pattern is valid")
});

const CUSTOM_FIELD_PREFIX: &str = "CustomField.";

/// Normalize a field path: strip whitespace, `CustomField.X` becomes `cf_X`
#[must_use]
pub fn format_field(field: &str) -> String {
    let compact: String = field.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.strip_prefix(CUSTOM_FIELD_PREFIX) {
        Some(name) => format!("cf_{name}"),
        None => compact,
    }
}

/// Format order-by entries into a comma-separated field list.
///
/// The remote API only takes bare field names, so a trailing `asc`/`desc`
/// is dropped.
pub fn format_order_by<S: AsRef<str>>(entries: &[S]) -> Result<Option<String>> {
    let mut fields = Vec::with_capacity(entries.len());
    for entry in entries {
        let raw = entry.as_ref().trim();
        let bare = ORDER_DIRECTION.replace(raw, "");
        let field = format_field(&bare);
        if field.is_empty() || !ORDER_FIELD.is_match(&field) {
            return Err(Error::Validation(format!(
                "Invalid orderBy entry '{raw}'. Use a field name such as 'CreateDate'"
            )));
        }
        fields.push(field);
    }
    Ok((!fields.is_empty()).then(|| fields.join(",")))
}

/// Format include entries into `[A,B.C]`. Entries may contain letters and
/// dots only.
pub fn format_include<S: AsRef<str>>(entries: &[S]) -> Result<Option<String>> {
    let mut fields = Vec::with_capacity(entries.len());
    for entry in entries {
        let raw = entry.as_ref().trim();
        if !INCLUDE_ENTRY.is_match(raw) {
            return Err(Error::Validation(format!(
                "Invalid include entry '{raw}'. Only letters and dots are allowed"
            )));
        }
        fields.push(format_field(raw));
    }
    Ok((!fields.is_empty()).then(|| format!("[{}]", fields.join(","))))
}
