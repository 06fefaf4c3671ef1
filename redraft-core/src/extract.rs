//! # Extraction gate
//!
//! Model responses are untrusted prose. The only text this system will ever
//! execute is the content between a designated open/close tag pair, pulled
//! out by [`TagPair::extract`]. No tags means nothing to run - callers treat
//! that as a hard stop, never as "run the whole response".

use serde::{Deserialize, Serialize};

/// A delimiter pair marking executable content inside free-form text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPair {
    name: String,
    open: String,
    close: String,
}

impl TagPair {
    /// Build a pair from a tag name: `name` -> `<name>` / `</name>`
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let open = format!("<{}>", name);
        let close = format!("</{}>", name);
        Self { name, open, close }
    }

    /// The marker for generated Python chart code
    pub fn execute_python() -> Self {
        Self::named("execute_python")
    }

    /// The marker for generated SQL queries
    pub fn execute_sql() -> Self {
        Self::named("execute_sql")
    }

    /// Tag name without angle brackets
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opening marker, e.g. `<execute_python>`
    pub fn open(&self) -> &str {
        &self.open
    }

    /// Closing marker, e.g. `</execute_python>`
    pub fn close(&self) -> &str {
        &self.close
    }

    /// Extract the content strictly between the first matching open/close
    /// pair, trimmed of surrounding whitespace.
    ///
    /// Returns `None` when no pair exists, when the close marker never
    /// follows the open marker, or when the block is empty after trimming.
    /// An empty block counts as not found: there is never a reason to hand
    /// empty text to an executor.
    ///
    /// Deterministic, no retries. Running it again over already-extracted
    /// text yields `None` since the markers are gone.
    pub fn extract<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let start = raw.find(&self.open)? + self.open.len();
        let end = raw[start..].find(&self.close)? + start;
        let inner = raw[start..end].trim();
        if inner.is_empty() {
            None
        } else {
            Some(inner)
        }
    }

    /// Wrap body text in this pair (the inverse of `extract`)
    pub fn wrap(&self, body: &str) -> String {
        format!("{}\n{}\n{}", self.open, body.trim(), self.close)
    }

    /// Wrap only if the open marker is not already present
    pub fn ensure_wrapped(&self, text: &str) -> String {
        if text.contains(&self.open) {
            text.to_string()
        } else {
            self.wrap(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_between_tags() {
        let tag = TagPair::execute_python();
        let raw = "blah <execute_python>x=1</execute_python> blah";
        assert_eq!(tag.extract(raw), Some("x=1"));
    }

    #[test]
    fn test_extract_trims_whitespace() {
        let tag = TagPair::execute_python();
        let raw = "<execute_python>\n  x = 1\n\n</execute_python>";
        assert_eq!(tag.extract(raw), Some("x = 1"));
    }

    #[test]
    fn test_extract_no_tags() {
        let tag = TagPair::execute_python();
        assert_eq!(tag.extract("here is some code: x = 1"), None);
    }

    #[test]
    fn test_extract_open_without_close() {
        let tag = TagPair::execute_python();
        assert_eq!(tag.extract("<execute_python>x=1"), None);
    }

    #[test]
    fn test_extract_close_before_open() {
        let tag = TagPair::execute_python();
        assert_eq!(tag.extract("</execute_python> stray <execute_python>x=1"), None);
    }

    #[test]
    fn test_extract_first_pair_wins() {
        let tag = TagPair::execute_python();
        let raw = "<execute_python>a=1</execute_python>\n<execute_python>b=2</execute_python>";
        assert_eq!(tag.extract(raw), Some("a=1"));
    }

    #[test]
    fn test_extract_empty_block_is_none() {
        let tag = TagPair::execute_python();
        assert_eq!(tag.extract("<execute_python>   </execute_python>"), None);
    }

    #[test]
    fn test_extract_not_reentrant() {
        let tag = TagPair::execute_python();
        let raw = "prose <execute_python>x = 1</execute_python> prose";
        let inner = tag.extract(raw).unwrap();
        // the extracted text has no markers left, so a second pass finds nothing
        assert_eq!(tag.extract(inner), None);
    }

    #[test]
    fn test_multiline_block() {
        let tag = TagPair::execute_sql();
        let raw = "<execute_sql>\nSELECT color, SUM(price)\nFROM transactions\nGROUP BY color\n</execute_sql>";
        let sql = tag.extract(raw).unwrap();
        assert!(sql.starts_with("SELECT"));
        assert!(sql.ends_with("GROUP BY color"));
    }

    #[test]
    fn test_wrap_round_trip() {
        let tag = TagPair::execute_sql();
        let wrapped = tag.wrap("SELECT 1");
        assert_eq!(tag.extract(&wrapped), Some("SELECT 1"));
    }

    #[test]
    fn test_ensure_wrapped() {
        let tag = TagPair::execute_python();
        let already = "<execute_python>x=1</execute_python>";
        assert_eq!(tag.ensure_wrapped(already), already);
        assert_eq!(tag.extract(&tag.ensure_wrapped("x=1")), Some("x=1"));
    }
}
