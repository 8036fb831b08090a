//! Text chunking with configurable size and overlap.
//!
//! Lengths are counted in characters, not bytes, so a chunk of Cyrillic
//! text holds as many letters as one of ASCII text.

use ragdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// How a document is cut into chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Fixed-size windows that overlap and end on whitespace
    #[default]
    SlidingWindow,
    /// Whole sentences packed up to the size limit, no overlap
    Sentence,
}

/// Splits documents according to a validated size, overlap and strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    strategy: ChunkStrategy,
}

impl Chunker {
    /// Create a sliding-window chunker.
    ///
    /// # Errors
    /// * `AppError::Config` - If `chunk_size` is zero or `chunk_overlap >= chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            strategy: ChunkStrategy::SlidingWindow,
        })
    }

    pub fn with_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn strategy(&self) -> ChunkStrategy {
        self.strategy
    }

    /// Split `text` into trimmed, non-empty chunks in document order.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        match self.strategy {
            ChunkStrategy::SlidingWindow => chunk_text(text, self.chunk_size, self.chunk_overlap),
            ChunkStrategy::Sentence => chunk_sentences(text, self.chunk_size),
        }
    }
}

/// Chunk text into overlapping windows of at most `chunk_size` characters.
///
/// A window that stops inside the text is pulled back to the last whitespace
/// so words are not cut in half; without any whitespace the raw cut stands.
/// Empty or whitespace-only input yields no chunks.
///
/// The next window starts `chunk_overlap` characters before the previous
/// end. When that would not move forward the window starts at the previous
/// end instead, so the loop always terminates.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= chunk_size {
        let trimmed = text.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = (start + chunk_size).min(len);

        if end < len {
            if let Some(boundary) = (start + 1..=end).rev().find(|&i| chars[i].is_whitespace()) {
                end = boundary;
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if end >= len {
            break;
        }

        let next = end.saturating_sub(chunk_overlap);
        start = if next > start { next } else { end };
    }

    chunks
}

/// Pack whole sentences into chunks of roughly `chunk_size` characters.
///
/// Sentences end at `.`, `!` or `?`; each one is re-terminated with `". "`.
/// A sentence longer than `chunk_size` becomes a chunk of its own.
pub fn chunk_sentences(text: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in text.split(|c: char| matches!(c, '.' | '!' | '?')) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        let sentence_len = sentence.chars().count();
        if current_len + sentence_len > chunk_size && !current.is_empty() {
            chunks.push(current.trim().to_string());
            current.clear();
            current_len = 0;
        }

        current.push_str(sentence);
        current.push_str(". ");
        current_len += sentence_len + 2;
    }

    let last = current.trim();
    if !last.is_empty() {
        chunks.push(last.to_string());
    }

    chunks
}
