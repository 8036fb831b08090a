//! Embedding providers for knowledge bases.
//!
//! An embedder turns text into a fixed-length vector. The store compares
//! those vectors with cosine similarity, so every record of a base must be
//! embedded by the same model.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{MockEmbedder, OllamaEmbedder};
