//! Knowledge system type definitions.

use crate::chunker::ChunkStrategy;
use crate::embeddings::EmbeddingConfig;
use chrono::{DateTime, Utc};
use ragdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Name of the knowledge base
    #[serde(default)]
    pub name: String,

    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// How documents are cut into chunks
    #[serde(default)]
    pub chunk_strategy: ChunkStrategy,

    /// Chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Hits scoring below this are dropped before generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_similarity: Option<f32>,

    /// Embedding model settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Answer generation settings
    #[serde(default)]
    pub answer: AnswerConfig,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    5
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            chunk_strategy: ChunkStrategy::default(),
            top_k: default_top_k(),
            min_similarity: None,
            embedding: EmbeddingConfig::default(),
            answer: AnswerConfig::default(),
        }
    }
}

impl KnowledgeBaseConfig {
    /// Check the settings before any document is touched.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be positive".to_string()));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        if let Some(min) = self.min_similarity {
            if !(-1.0..=1.0).contains(&min) {
                return Err(AppError::Config(format!(
                    "min_similarity must lie in [-1, 1], got {}",
                    min
                )));
            }
        }

        self.embedding.validate()
    }
}

/// Wording and sampling for generated answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnswerConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,

    /// Who the assistant speaks for, used in the prompt preamble
    pub assistant_name: String,

    /// Where to send users whose question the documents cannot answer
    pub fallback_contact: String,

    /// Returned when no chunk is relevant to the question
    pub no_information_message: String,

    /// Returned when embedding or generation fails
    pub error_message: String,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            max_tokens: 1024,
            assistant_name: "the help desk".to_string(),
            fallback_contact: "the help desk hotline".to_string(),
            no_information_message:
                "Sorry, I could not find information relevant to your question in the knowledge base."
                    .to_string(),
            error_message:
                "Sorry, something went wrong while preparing the answer. Please try again later."
                    .to_string(),
        }
    }
}

/// Options for the learn operation.
#[derive(Debug, Clone)]
pub struct LearnOptions {
    /// Knowledge base name
    pub base_name: String,

    /// Files or directories to learn from
    pub paths: Vec<PathBuf>,

    /// Only learn paths containing one of these substrings
    pub include: Vec<String>,

    /// Skip paths containing any of these substrings
    pub exclude: Vec<String>,

    /// Clear the base before learning
    pub reset: bool,
}

/// A file that could not be learned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedSource {
    pub path: String,
    pub reason: String,
}

/// Statistics from a learn operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnStats {
    /// Number of sources added
    pub sources_count: u32,

    /// Number of chunks created
    pub chunks_count: u32,

    /// Chunks stored with a vector
    pub embedded_count: u32,

    /// Total bytes read
    pub bytes_processed: u64,

    /// Sources that were skipped
    pub failed: Vec<FailedSource>,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Aggregate figures for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStats {
    pub base_name: String,

    /// Distinct source documents
    pub total_documents: usize,

    /// Stored records
    pub total_chunks: usize,

    /// Records carrying a vector
    pub embedded_chunks: usize,

    /// Sum of chunk lengths in characters
    pub total_characters: usize,

    /// Vector length shared by all embedded records
    pub dimension: Option<usize>,

    pub created_at: DateTime<Utc>,

    /// Size of the persisted store file
    pub store_size_bytes: u64,
}
