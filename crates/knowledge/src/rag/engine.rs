//! Retrieval-augmented answering over one knowledge base.
//!
//! The engine ties the chunker, the embedder, the vector store and the
//! generation model together. Ingestion goes text → chunks → vectors →
//! store; a query goes question → vector → ranked chunks → prompt → answer.

use crate::chunker::Chunker;
use crate::embeddings::EmbeddingProvider;
use crate::rag::prompt::build_prompt;
use crate::rag::types::{confidence, QueryResponse, SourceRef, StreamEvent};
use crate::source::read_source;
use crate::store::{DocumentRecord, VectorStore};
use crate::types::{AnswerConfig, KnowledgeBaseConfig};
use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use ragdesk_core::{AppError, AppResult};
use ragdesk_llm::{LlmClient, LlmRequest};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store handle shared by every engine working on the same base.
///
/// Writers hold the lock for a whole append-and-persist, so concurrent
/// ingestion into one base cannot interleave half-written files.
pub type SharedStore = Arc<RwLock<VectorStore>>;

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Added { chunks: usize, embedded: usize },
    Failed { reason: String },
}

impl IngestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Added { .. })
    }
}

/// What retrieval found for a question.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Nothing in the store is relevant; answer with the no-information text
    NoMatches,
    Matches {
        sources: Vec<SourceRef>,
        /// Full chunk texts, best first
        contexts: Vec<String>,
        /// Unrounded similarities, best first
        similarities: Vec<f32>,
    },
}

/// Answers questions from a knowledge base.
///
/// Cheap to clone; clones share the store, embedder and model client.
#[derive(Clone)]
pub struct RagEngine {
    store: SharedStore,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    llm: Arc<dyn LlmClient>,
    model: String,
    chunker: Chunker,
    min_similarity: Option<f32>,
    answer: AnswerConfig,
}

impl RagEngine {
    /// Create an engine without an embedder.
    ///
    /// # Errors
    /// * `AppError::Config` - If the base config fails validation
    pub fn new(
        store: SharedStore,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        config: &KnowledgeBaseConfig,
    ) -> AppResult<Self> {
        config.validate()?;
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?
            .with_strategy(config.chunk_strategy);

        Ok(Self {
            store,
            embedder: None,
            llm,
            model: model.into(),
            chunker,
            min_similarity: config.min_similarity,
            answer: config.answer.clone(),
        })
    }

    /// Set the embedder; `None` stores chunks without vectors.
    pub fn with_embedder(mut self, embedder: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn embedder(&self) -> Option<&Arc<dyn EmbeddingProvider>> {
        self.embedder.as_ref()
    }

    pub fn answer_config(&self) -> &AnswerConfig {
        &self.answer
    }

    /// Chunk, embed and store one document.
    ///
    /// Learning a `source_id` again replaces its previous chunks. Never
    /// returns an error: every failure is reported as
    /// [`IngestOutcome::Failed`] and leaves the store as it was. A chunk
    /// whose embedding fails is still stored, without a vector.
    pub async fn add_document(&self, source_id: &str, text: &str) -> IngestOutcome {
        self.ingest(source_id, text, None).await
    }

    /// Read a file and ingest it under its file name.
    pub async fn add_file(&self, path: &Path) -> IngestOutcome {
        match read_source(path) {
            Ok(doc) => self.ingest(&doc.source_id, &doc.text, Some(path)).await,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                IngestOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn ingest(&self, source_id: &str, text: &str, file_path: Option<&Path>) -> IngestOutcome {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            tracing::warn!("Document '{}' has no text to learn", source_id);
            return IngestOutcome::Failed {
                reason: format!("Document '{}' is empty", source_id),
            };
        }

        // Embed before taking the lock so slow model calls do not block readers
        let embeddings: Vec<Option<Vec<f32>>> = match &self.embedder {
            Some(embedder) => embedder
                .embed_batch(&chunks)
                .await
                .into_iter()
                .enumerate()
                .map(|(i, result)| {
                    result
                        .map_err(|e| {
                            tracing::warn!("Chunk {} of '{}' not embedded: {}", i, source_id, e)
                        })
                        .ok()
                })
                .collect(),
            None => vec![None; chunks.len()],
        };

        let total_chunks = chunks.len();
        let file_size = text.chars().count();
        let embedded = embeddings.iter().filter(|e| e.is_some()).count();

        let records: Vec<DocumentRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk, embedding))| {
                let mut record = DocumentRecord::new(chunk, source_id, i as u32)
                    .with_embedding(embedding);
                if let Some(path) = file_path {
                    record = record.with_metadata("file_path", path.display().to_string());
                }
                let chunk_size = record.text.chars().count();
                record
                    .with_metadata("chunk_size", chunk_size)
                    .with_metadata("total_chunks", total_chunks)
                    .with_metadata("file_size", file_size)
            })
            .collect();

        let mut store = self.store.write().await;
        match store.replace_source(source_id, records) {
            Ok(count) => {
                tracing::info!(
                    "Learned '{}': {} chunks ({} embedded)",
                    source_id,
                    count,
                    embedded
                );
                IngestOutcome::Added {
                    chunks: count,
                    embedded,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to store '{}': {}", source_id, e);
                IngestOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Embed the question and rank the stored chunks.
    ///
    /// `top_k` of zero is treated as one.
    ///
    /// # Errors
    /// * `AppError::Embedding` - If there is no embedder or it fails
    /// * `AppError::DimensionMismatch` - If the embedder returns a wrong-sized vector
    pub async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Retrieval> {
        let embedder = self.embedder.as_ref().ok_or_else(|| {
            AppError::Embedding("No embedding provider configured for this base".to_string())
        })?;

        let query_embedding = embedder.embed(query).await?;

        let store = self.store.read().await;
        let mut hits = store.search(&query_embedding, top_k.max(1));
        if let Some(min) = self.min_similarity {
            hits.retain(|hit| hit.similarity >= min);
        }

        if hits.is_empty() {
            tracing::info!("No relevant chunks for query ({} records searched)", store.len());
            return Ok(Retrieval::NoMatches);
        }

        tracing::debug!(
            "Retrieved {} chunks (best similarity {:.3})",
            hits.len(),
            hits[0].similarity
        );

        Ok(Retrieval::Matches {
            sources: hits.iter().map(SourceRef::from_hit).collect(),
            contexts: hits.iter().map(|hit| hit.record.text.clone()).collect(),
            similarities: hits.iter().map(|hit| hit.similarity).collect(),
        })
    }

    fn build_request(&self, query: &str, contexts: &[String], similarities: &[f32]) -> LlmRequest {
        let best = similarities.first().copied().unwrap_or(0.0);
        let prompt = build_prompt(contexts, query, best, &self.answer);

        LlmRequest::new(prompt, self.model.clone())
            .with_temperature(self.answer.temperature)
            .with_max_tokens(self.answer.max_tokens)
            .with_top_p(self.answer.top_p)
    }

    /// Answer a question in one piece.
    ///
    /// Never fails: embedding and generation errors come back as a response
    /// carrying an error message with confidence 0.0.
    #[tracing::instrument(skip(self), fields(model = %self.model))]
    pub async fn query(&self, query: &str, top_k: usize) -> QueryResponse {
        let (sources, contexts, similarities) = match self.retrieve(query, top_k).await {
            Ok(Retrieval::NoMatches) => {
                return QueryResponse::no_information(&self.answer.no_information_message)
            }
            Ok(Retrieval::Matches {
                sources,
                contexts,
                similarities,
            }) => (sources, contexts, similarities),
            Err(e) => {
                tracing::warn!("Retrieval failed: {}", e);
                return QueryResponse::failed(
                    format!("{} ({})", self.answer.error_message, e),
                    Vec::new(),
                );
            }
        };

        let request = self.build_request(query, &contexts, &similarities);
        match self.llm.complete(&request).await {
            Ok(response) => QueryResponse {
                response: response.content.trim().to_string(),
                sources,
                confidence: confidence(&similarities),
            },
            Err(e) => {
                tracing::warn!("Generation failed: {}", e);
                QueryResponse::failed(format!("{} ({})", self.answer.error_message, e), sources)
            }
        }
    }

    /// Answer a question as a stream of events.
    ///
    /// The stream yields one `Meta` event, then a `Token` per fragment the
    /// model produces, then a single `Done`. Nothing runs until it is
    /// polled. Dropping it early drops the model stream with it.
    pub fn stream_query(&self, query: impl Into<String>, top_k: usize) -> BoxStream<'static, StreamEvent> {
        let engine = self.clone();
        let query = query.into();

        Box::pin(stream! {
            let (sources, contexts, similarities) = match engine.retrieve(&query, top_k).await {
                Ok(Retrieval::Matches { sources, contexts, similarities }) => {
                    (sources, contexts, similarities)
                }
                Ok(Retrieval::NoMatches) => {
                    yield StreamEvent::Meta { sources: Vec::new(), confidence: 0.0 };
                    yield StreamEvent::Done {
                        response: engine.answer.no_information_message.clone(),
                    };
                    return;
                }
                Err(e) => {
                    tracing::warn!("Retrieval failed: {}", e);
                    yield StreamEvent::Meta { sources: Vec::new(), confidence: 0.0 };
                    yield StreamEvent::Done { response: engine.answer.error_message.clone() };
                    return;
                }
            };

            yield StreamEvent::Meta {
                sources,
                confidence: confidence(&similarities),
            };

            let request = engine
                .build_request(&query, &contexts, &similarities)
                .with_streaming();

            let mut fragments = match engine.llm.stream(&request).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    tracing::warn!("Generation failed to start: {}", e);
                    yield StreamEvent::Done { response: engine.answer.error_message.clone() };
                    return;
                }
            };

            let mut answer = String::new();
            while let Some(item) = fragments.next().await {
                match item {
                    Ok(chunk) => {
                        if !chunk.content.is_empty() {
                            answer.push_str(&chunk.content);
                            yield StreamEvent::Token { text: chunk.content };
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Generation failed mid-stream: {}", e);
                        yield StreamEvent::Done { response: engine.answer.error_message.clone() };
                        return;
                    }
                }
            }

            yield StreamEvent::Done { response: answer.trim().to_string() };
        })
    }
}
