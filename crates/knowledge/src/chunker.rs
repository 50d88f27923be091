//! Text chunking with configurable size and overlap.

use notewise_core::{AppError, AppResult};
use text_splitter::{ChunkConfig, TextSplitter};

/// Split `text` into chunks of at most `chunk_size` characters.
///
/// Boundaries prefer paragraphs, then sentences, then words (via
/// `text-splitter`). Neighbouring chunks share up to `overlap` characters.
/// Whitespace-only chunks are dropped.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> AppResult<Vec<String>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| AppError::Config(format!("Invalid chunking settings: {}", e)))?;
    let splitter = TextSplitter::new(config);

    let chunks: Vec<String> = splitter
        .chunks(text)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect();

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_basic() {
        let text = "This is a test sentence. ".repeat(100);
        let chunks = chunk_text(&text, 200, 20).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200);
        }
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("The quarterly report was delayed.", 1024, 64).unwrap();
        assert_eq!(chunks, vec!["The quarterly report was delayed.".to_string()]);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("", 100, 10).unwrap().is_empty());
        assert!(chunk_text("   \n\n  ", 100, 10).unwrap().is_empty());
    }

    #[test]
    fn test_chunk_text_utf8() {
        let text = "Relatório atrasado por causa do fornecedor 🚚. ".repeat(50);
        let chunks = chunk_text(&text, 120, 10).unwrap();

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 120);
        }
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let result = chunk_text("some text", 10, 20);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
