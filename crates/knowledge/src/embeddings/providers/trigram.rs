//! Deterministic offline embedder built from word and character-trigram hashes.

use crate::embeddings::provider::EmbeddingProvider;
use notewise_core::AppResult;
use std::collections::HashMap;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "how", "did", "does",
];

/// Hashing embedder for tests and air-gapped installs.
///
/// Texts that share words land close together; there is no notion of
/// synonyms. Output is unit length, or all zeros for text without content
/// words.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let idx = self.bucket(&trigram, 37);
                embedding[idx] += (*freq as f32).sqrt();
            }

            // Whole-word hit weighs more than any single trigram
            let idx = self.bucket(word, 31);
            embedding[idx] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }

    fn bucket(&self, token: &str, multiplier: u64) -> usize {
        let hash = token
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
