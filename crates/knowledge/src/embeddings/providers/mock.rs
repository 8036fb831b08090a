//! Offline embedder built from word and character-trigram hashes.

use crate::embeddings::provider::EmbeddingProvider;
use ragdesk_core::AppResult;
use std::collections::{HashMap, HashSet};

/// Words too common to say anything about a chunk.
const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Deterministic embedder for tests and for running without a model server.
///
/// Texts sharing words land near each other, which is enough to exercise
/// ranking end to end. It carries no real semantics.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    pub const DEFAULT_DIMENSIONS: usize = 384;

    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_with(seed: u64, bytes: impl Iterator<Item = u8>) -> u64 {
        bytes.fold(0u64, |acc, b| acc.wrapping_mul(seed).wrapping_add(b as u64))
    }

    /// Hash words and their trigrams into buckets, then scale to unit length.
    ///
    /// Text without any content words maps to the zero vector.
    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !stop_words.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let bucket = Self::hash_with(37, trigram.bytes()) as usize % self.dimensions;
                embedding[bucket] += (*freq as f32).sqrt();
            }

            let bucket = Self::hash_with(31, word.bytes()) as usize % self.dimensions;
            embedding[bucket] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        Ok(self.vectorize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_embedding_is_unit_length() {
        let provider = MockEmbedder::new(384);
        let embedding = provider.embed("visiting hours of the cardiology wing").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = MockEmbedder::default();
        let first = provider.embed("deterministic test").await.unwrap();
        let second = provider.embed("deterministic test").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_different_texts_differ() {
        let provider = MockEmbedder::default();
        let first = provider.embed("hello world").await.unwrap();
        let second = provider.embed("goodbye world").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_stop_words_only_is_zero_vector() {
        let provider = MockEmbedder::new(16);
        let embedding = provider.embed("the and of").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_cyrillic_text() {
        let provider = MockEmbedder::default();
        let embedding = provider.embed("Отделение кардиологии работает круглосуточно").await.unwrap();
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}
