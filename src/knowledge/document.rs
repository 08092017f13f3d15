//! Document payload schema shared by ingestion, listing and stats.

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::ApiError;

pub const PREVIEW_CHARS: usize = 150;
pub const FALLBACK_TITLE_CHARS: usize = 30;
pub const UNTITLED: &str = "Untitled Document";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Text,
    Pdf,
    Youtube,
    Audio,
    Image,
    Website,
    Manual,
}

impl SourceType {
    pub const ALL: [SourceType; 7] = [
        SourceType::Text,
        SourceType::Pdf,
        SourceType::Youtube,
        SourceType::Audio,
        SourceType::Image,
        SourceType::Website,
        SourceType::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Text => "text",
            SourceType::Pdf => "pdf",
            SourceType::Youtube => "youtube",
            SourceType::Audio => "audio",
            SourceType::Image => "image",
            SourceType::Website => "website",
            SourceType::Manual => "manual",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        SourceType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid source type: {}", s)))
    }
}

/// What callers may hand to `KnowledgeStore::add`.
#[derive(Debug, Clone)]
pub enum DocumentInput {
    Text(String),
    /// Raw bytes, decoded as UTF-8 with replacement characters.
    Bytes(Vec<u8>),
    /// Text plus caller-supplied payload fields (title, source, ...).
    Structured {
        text: String,
        metadata: Map<String, Value>,
    },
}

impl DocumentInput {
    pub fn into_parts(self) -> (String, Map<String, Value>) {
        match self {
            DocumentInput::Text(text) => (text, Map::new()),
            DocumentInput::Bytes(bytes) => (String::from_utf8_lossy(&bytes).into_owned(), Map::new()),
            DocumentInput::Structured { text, mut metadata } => {
                metadata.remove("text");
                (text, metadata)
            }
        }
    }
}

/// A stored point as returned by listing: id plus the full payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub payload: Map<String, Value>,
}

impl DocumentRecord {
    pub fn text(&self) -> Option<&str> {
        self.payload.get("text").and_then(Value::as_str)
    }

    pub fn size(&self) -> u64 {
        self.payload.get("size").and_then(Value::as_u64).unwrap_or(0)
    }
}

/// Counts derived from the document text at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextCounts {
    pub size: usize,
    pub chars: usize,
    pub words: usize,
    pub lines: usize,
}

impl TextCounts {
    pub fn of(text: &str) -> Self {
        Self {
            size: text.len(),
            chars: text.chars().count(),
            words: count_words(text),
            lines: text.lines().count(),
        }
    }
}

/// Tokens separated by spaces or tabs; line breaks do not split words.
pub fn count_words(text: &str) -> usize {
    text.split(|c: char| c.is_whitespace() && c != '\n' && c != '\r')
        .filter(|token| !token.is_empty())
        .count()
}

pub fn make_preview(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, PREVIEW_CHARS)
}

/// Keeps the first `max` characters, appending `...` when anything was cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

pub fn fallback_title(text: &str) -> String {
    let first_line = text.trim().lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        UNTITLED.to_string()
    } else {
        truncate_chars(first_line, FALLBACK_TITLE_CHARS)
    }
}

/// Fills preview, counts and timestamp into `metadata` where the caller did
/// not already supply them.
pub fn derive_metadata(text: &str, metadata: &mut Map<String, Value>) {
    let counts = TextCounts::of(text);
    metadata
        .entry("timestamp")
        .or_insert_with(|| Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)));
    metadata
        .entry("preview")
        .or_insert_with(|| Value::String(make_preview(text)));
    metadata.entry("size").or_insert_with(|| Value::from(counts.size));
    metadata.entry("chars").or_insert_with(|| Value::from(counts.chars));
    metadata.entry("words").or_insert_with(|| Value::from(counts.words));
    metadata.entry("lines").or_insert_with(|| Value::from(counts.lines));
}

/// True when the payload carries a non-blank string title.
pub fn has_title(metadata: &Map<String, Value>) -> bool {
    metadata
        .get("title")
        .and_then(Value::as_str)
        .map(|t| !t.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_match_documented_example() {
        let counts = TextCounts::of("a b\nc");
        assert_eq!(counts.size, 5);
        assert_eq!(counts.words, 2);
        assert_eq!(counts.lines, 2);
        assert_eq!(counts.chars, 5);
    }

    #[test]
    fn size_is_byte_length() {
        let counts = TextCounts::of("héllo");
        assert_eq!(counts.size, 6);
        assert_eq!(counts.chars, 5);
    }

    #[test]
    fn preview_collapses_whitespace_and_truncates() {
        assert_eq!(make_preview("  one\n\n two\tthree "), "one two three");
        let preview = make_preview(&"word ".repeat(100));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn fallback_title_uses_first_line() {
        assert_eq!(fallback_title("\n  Short heading\nbody"), "Short heading");
        assert_eq!(
            fallback_title("This first line is definitely longer than thirty characters"),
            "This first line is definitely ..."
        );
        assert_eq!(fallback_title("   \n  "), UNTITLED);
    }

    #[test]
    fn derive_metadata_keeps_caller_values() {
        let mut metadata = Map::new();
        metadata.insert("size".to_string(), json!(999));
        metadata.insert("timestamp".to_string(), json!("2024-01-01T00:00:00Z"));
        derive_metadata("a b\nc", &mut metadata);

        assert_eq!(metadata["size"], json!(999));
        assert_eq!(metadata["timestamp"], json!("2024-01-01T00:00:00Z"));
        assert_eq!(metadata["words"], json!(2));
        assert_eq!(metadata["lines"], json!(2));
        assert_eq!(metadata["preview"], json!("a b c"));
    }

    #[test]
    fn bytes_input_is_decoded_lossily() {
        let (text, metadata) = DocumentInput::Bytes(vec![b'o', b'k', 0xff]).into_parts();
        assert_eq!(text, "ok\u{FFFD}");
        assert!(metadata.is_empty());
    }

    #[test]
    fn source_type_parses_case_insensitively() {
        assert_eq!("PDF".parse::<SourceType>().unwrap(), SourceType::Pdf);
        assert_eq!(SourceType::Youtube.to_string(), "youtube");
        assert!("podcast".parse::<SourceType>().is_err());
    }

    #[test]
    fn blank_title_is_not_a_title() {
        let mut metadata = Map::new();
        assert!(!has_title(&metadata));
        metadata.insert("title".to_string(), json!("  "));
        assert!(!has_title(&metadata));
        metadata.insert("title".to_string(), json!("Notes"));
        assert!(has_title(&metadata));
    }
}
