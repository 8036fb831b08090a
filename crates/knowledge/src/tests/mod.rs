//! Scenario tests spanning store, search and the RAG engine.


use crate::embeddings::EmbeddingProvider;
use crate::rag::RagEngine;
use crate::store::{DocumentRecord, VectorStore};
use crate::types::KnowledgeBaseConfig;
use ragdesk_core::{AppError, AppResult};
use ragdesk_llm::LlmClient;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::RwLock;

/// Embedder answering from a fixed table; unknown texts fail.
#[derive(Debug, Default)]
pub(crate) struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl StaticEmbedder {
    pub(crate) fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for StaticEmbedder {
    fn provider_name(&self) -> &str {
        "static"
    }

    fn model_name(&self) -> &str {
        "fixed"
    }

    fn dimensions(&self) -> Option<usize> {
        None
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| AppError::Embedding(format!("no vector for '{}'", text)))
    }
}

/// Helper to create a normalized embedding.
pub(crate) fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

pub(crate) fn test_config() -> KnowledgeBaseConfig {
    KnowledgeBaseConfig {
        name: "test".to_string(),
        chunk_size: 200,
        chunk_overlap: 20,
        ..KnowledgeBaseConfig::default()
    }
}

pub(crate) fn engine_with(
    temp: &TempDir,
    llm: Arc<dyn LlmClient>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
) -> RagEngine {
    let store = VectorStore::new(temp.path().join("vector_store.json"));
    RagEngine::new(Arc::new(RwLock::new(store)), llm, "mock", &test_config())
        .unwrap()
        .with_embedder(embedder)
}

pub(crate) async fn seed(engine: &RagEngine, records: Vec<DocumentRecord>) {
    engine.store().write().await.append_many(records).unwrap();
}

pub(crate) fn embedded(text: &str, source: &str, seq: u32, vector: Vec<f32>) -> DocumentRecord {
    DocumentRecord::new(text, source, seq).with_embedding(Some(vector))
}
