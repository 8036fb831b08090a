//! RAG response types.

use crate::search::SearchHit;
use serde::{Deserialize, Serialize};

/// Characters of chunk text shown in a source reference.
pub const SNIPPET_CHARS: usize = 200;

/// A single source reference used to answer a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source document name (e.g., "contacts.md")
    pub file: String,

    /// Position of the chunk within its source
    pub chunk_id: u32,

    /// Cosine similarity, rounded to 3 decimals
    pub similarity: f32,

    /// Leading part of the chunk text
    pub text: String,
}

impl SourceRef {
    pub fn from_hit(hit: &SearchHit<'_>) -> Self {
        Self {
            file: hit.record.source_id.clone(),
            chunk_id: hit.record.sequence_index,
            similarity: round3(hit.similarity),
            text: truncate_snippet(&hit.record.text, SNIPPET_CHARS),
        }
    }
}

/// Answer to a buffered query.
///
/// Always well-formed: failures are reported through `response` with a
/// confidence of 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub sources: Vec<SourceRef>,
    pub confidence: f32,
}

impl QueryResponse {
    /// Terminal answer when nothing relevant was retrieved.
    pub fn no_information(message: &str) -> Self {
        Self {
            response: message.to_string(),
            sources: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Answer carrying a failure message.
    pub fn failed(message: String, sources: Vec<SourceRef>) -> Self {
        Self {
            response: message,
            sources,
            confidence: 0.0,
        }
    }
}

/// One event of a streamed answer.
///
/// A stream is one `Meta`, any number of `Token`s, then exactly one `Done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Meta {
        sources: Vec<SourceRef>,
        confidence: f32,
    },
    Token {
        text: String,
    },
    Done {
        response: String,
    },
}

impl StreamEvent {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Round to 3 decimal places.
pub fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

/// Mean similarity of the retrieved chunks, clamped to [0, 1] and rounded.
///
/// A heuristic, not a calibrated probability. No sources means 0.0.
pub fn confidence(similarities: &[f32]) -> f32 {
    if similarities.is_empty() {
        return 0.0;
    }
    let mean = similarities.iter().sum::<f32>() / similarities.len() as f32;
    round3(mean.clamp(0.0, 1.0))
}

/// Truncate to `max_chars` characters, marking the cut with "...".
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
