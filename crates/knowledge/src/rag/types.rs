//! RAG response types.

use crate::types::ScoredChunk;
use notewise_prompt::Turn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// File name reported when a chunk carries no source path.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Appended to previews that were cut short.
pub const TRUNCATION_MARKER: &str = "...";

/// One retrieved chunk as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Basename of the originating file, or `"unknown"`
    pub filename: String,

    /// Similarity score; 0.0 when the store reported none
    pub score: f32,

    /// Chunk text preview, bounded by the preview budget
    pub text: String,
}

impl SourceRef {
    pub fn from_scored(scored: &ScoredChunk, preview_chars: usize) -> Self {
        Self {
            filename: scored
                .chunk
                .source_path()
                .and_then(|p| Path::new(p).file_name())
                .and_then(|name| name.to_str())
                .unwrap_or(UNKNOWN_SOURCE)
                .to_string(),
            score: scored.score.unwrap_or(0.0),
            text: preview(&scored.chunk.text, preview_chars),
        }
    }
}

/// Answer to one chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub response: String,

    /// One entry per retrieved chunk, in retrieval order
    pub sources: Vec<SourceRef>,
}

/// Ordered turn history of one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Record a completed exchange. Both turns land together or not at all.
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn::user(question));
        self.turns.push(Turn::assistant(answer));
    }
}

/// Cut `text` to at most `budget` characters (grapheme clusters), adding
/// [`TRUNCATION_MARKER`] only when something was removed.
pub fn preview(text: &str, budget: usize) -> String {
    let mut graphemes = text.grapheme_indices(true);

    match graphemes.nth(budget) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{}", text[..cut].trim_end(), TRUNCATION_MARKER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnowledgeChunk;

    fn scored(metadata: serde_json::Value, score: Option<f32>, text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: KnowledgeChunk {
                id: "c1".to_string(),
                text: text.to_string(),
                metadata,
            },
            score,
        }
    }

    #[test]
    fn test_short_preview_is_unmarked() {
        assert_eq!(preview("Short text", 200), "Short text");
        assert_eq!(preview("exactly5", 8), "exactly5");
    }

    #[test]
    fn test_long_preview_is_bounded() {
        let long = "word ".repeat(100);
        let result = preview(&long, 200);

        assert!(result.ends_with(TRUNCATION_MARKER));
        assert!(result.chars().count() <= 200 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_preview_never_splits_multibyte() {
        let text = "é".repeat(10) + &"🎮".repeat(10);
        let result = preview(&text, 12);

        assert_eq!(result, format!("{}{}{}", "é".repeat(10), "🎮🎮", TRUNCATION_MARKER));
    }

    #[test]
    fn test_preview_counts_combining_sequences_once() {
        // "e" + combining acute accent is one grapheme
        let text = "e\u{301}".repeat(4);
        assert_eq!(preview(&text, 4), text);
        assert_eq!(preview(&text, 2), format!("{}{}", "e\u{301}".repeat(2), TRUNCATION_MARKER));
    }

    #[test]
    fn test_source_ref_uses_basename() {
        let source = SourceRef::from_scored(
            &scored(
                serde_json::json!({"source_path": "/home/me/notes/q3/report.md"}),
                Some(0.82),
                "The quarterly report was delayed.",
            ),
            200,
        );

        assert_eq!(source.filename, "report.md");
        assert_eq!(source.score, 0.82);
        assert_eq!(source.text, "The quarterly report was delayed.");
    }

    #[test]
    fn test_source_ref_sentinels() {
        let source = SourceRef::from_scored(&scored(serde_json::json!({}), None, "x"), 200);
        assert_eq!(source.filename, UNKNOWN_SOURCE);
        assert_eq!(source.score, 0.0);
    }

    #[test]
    fn test_conversation_records_pairs() {
        let mut conversation = Conversation::new();
        assert!(conversation.is_empty());

        conversation.record_exchange("M1", "A1");
        assert_eq!(conversation.turns(), &[Turn::user("M1"), Turn::assistant("A1")]);
    }

    #[test]
    fn test_source_ref_serialization_shape() {
        let source = SourceRef {
            filename: "a.md".to_string(),
            score: 0.5,
            text: "t".to_string(),
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json, serde_json::json!({"filename": "a.md", "score": 0.5, "text": "t"}));
    }
}
