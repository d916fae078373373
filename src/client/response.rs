//! Response envelopes decoded at the HTTP boundary

use serde::{Deserialize, Serialize};

/// Paged collection returned by list endpoints: `{ "Items": [...], "Next": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedCollection<T> {
    /// Items on this page
    #[serde(rename = "Items", default = "Vec::new")]
    pub items: Vec<T>,
    /// Link to the next page, if any
    #[serde(rename = "Next", default)]
    pub next: Option<String>,
}

impl<T> PagedCollection<T> {
    /// Whether the server advertised another page
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// Error body returned with non-success statuses
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorBody {
    /// Primary message
    #[serde(default)]
    pub message: Option<String>,
    /// Alternate message field
    #[serde(default)]
    pub error_message: Option<String>,
    /// Description field
    #[serde(default)]
    pub description: Option<String>,
}

impl ErrorBody {
    /// First non-empty of `Message`, `ErrorMessage`, `Description`
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        [&self.message, &self.error_message, &self.description]
            .into_iter()
            .filter_map(Option::as_deref)
            .map(str::trim)
            .find(|m| !m.is_empty())
    }
}

/// Build a human-readable message from an error response body
#[must_use]
pub fn extract_error_message(body: &[u8], status_text: &str) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message().map(str::to_string))
        .unwrap_or_else(|| status_text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_error_message_precedence() {
        let body = br#"{"Description":"d","ErrorMessage":"e","Message":"m"}"#;
        assert_eq!(extract_error_message(body, "Bad Request"), "m");

        let body = br#"{"Description":"d","ErrorMessage":"e"}"#;
        assert_eq!(extract_error_message(body, "Bad Request"), "e");

        let body = br#"{"Description":"d","Message":"  "}"#;
        assert_eq!(extract_error_message(body, "Bad Request"), "d");
    }

    #[test]
    fn test_error_message_falls_back_to_status() {
        assert_eq!(
            extract_error_message(b"<html>oops</html>", "Service Unavailable"),
            "Service Unavailable"
        );
        assert_eq!(extract_error_message(b"{}", "Not Found"), "Not Found");
    }

    #[test]
    fn test_paged_collection_decoding() {
        let page: PagedCollection<Value> = serde_json::from_str(
            r#"{"Next":"https://x/api/v1/Bugs?skip=25","Items":[{"Id":1},{"Id":2}]}"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.has_next());

        let page: PagedCollection<Value> = serde_json::from_str(r#"{"Items":[]}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_next());
    }
}
