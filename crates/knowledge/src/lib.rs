//! Knowledge base management system.
//!
//! Provides local-first RAG over a JSON-persisted vector store: documents
//! are chunked, embedded and stored per base under
//! `.ragdesk/knowledge/<base>/`, then queried with brute-force cosine search
//! and answered by a generation model.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod rag;
pub mod search;
pub mod source;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::{ChunkStrategy, Chunker};
pub use rag::{IngestOutcome, QueryResponse, RagEngine, Retrieval, SharedStore, SourceRef, StreamEvent};
pub use search::SearchHit;
pub use store::{DocumentRecord, LoadStatus, StoreMetadata, VectorStore};
pub use types::{AnswerConfig, BaseStats, FailedSource, KnowledgeBaseConfig, LearnOptions, LearnStats};

use embeddings::OllamaEmbedder;
use ragdesk_core::{AppConfig, AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Load a base's store from disk into a shareable handle.
pub fn open_store(workspace: &Path, base_name: &str) -> SharedStore {
    let path = config::get_store_path(workspace, base_name);
    Arc::new(RwLock::new(VectorStore::open(path)))
}

/// Build the engine for a base from its config and the workspace settings.
///
/// The generation provider, model and endpoint come from `app`; chunking,
/// embedding and answer wording come from the base's `config.yaml`.
pub fn open_engine(app: &AppConfig, base_name: &str) -> AppResult<RagEngine> {
    let base_config = config::load_config(&app.workspace, base_name)?;
    base_config.validate()?;

    let llm = ragdesk_llm::create_client(&app.provider, Some(&app.endpoint), app.timeout_secs)
        .map_err(AppError::Config)?;
    let embedder = embeddings::create_provider(&base_config.embedding, &app.endpoint)?;

    tracing::debug!(
        "Opening base '{}' (generation: {}/{}, embedding: {}/{})",
        base_name,
        app.provider,
        app.model,
        base_config.embedding.provider,
        base_config.embedding.model
    );

    let store = open_store(&app.workspace, base_name);
    Ok(RagEngine::new(store, llm, app.model.clone(), &base_config)?.with_embedder(embedder))
}

/// Learn from sources and populate the knowledge base.
///
/// Writes the base's `config.yaml` on first use so its settings can be
/// edited afterwards. Files that cannot be learned are listed in
/// [`LearnStats::failed`] rather than aborting the run.
pub async fn learn(app: &AppConfig, options: LearnOptions) -> AppResult<LearnStats> {
    let start = Instant::now();

    tracing::info!("Starting learn operation for base '{}'", options.base_name);

    let base_config = config::load_config(&app.workspace, &options.base_name)?;
    base_config.validate()?;
    if !config::get_config_path(&app.workspace, &options.base_name).exists() {
        config::save_config(&app.workspace, &base_config)?;
    }

    if base_config.embedding.provider == "ollama" {
        let endpoint = base_config
            .embedding
            .endpoint
            .as_deref()
            .unwrap_or(&app.endpoint);
        OllamaEmbedder::new(&base_config.embedding, endpoint)?
            .check_connection()
            .await?;
    }

    let engine = open_engine(app, &options.base_name)?;

    if options.reset {
        tracing::info!("Resetting knowledge base '{}'", options.base_name);
        engine.store().write().await.clear()?;
    }

    let files = source::collect_files(&options.paths, &options.include, &options.exclude);
    if files.is_empty() {
        return Err(AppError::Knowledge(
            "No supported files (.txt, .md, .py) found in the given paths".to_string(),
        ));
    }

    let mut stats = LearnStats::default();
    let mut learned_names: HashMap<String, &Path> = HashMap::new();

    for path in &files {
        // Records are keyed by file name, so a second file with the same
        // name would replace the first one's chunks
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(first) = learned_names.get(&name) {
            tracing::warn!("Skipping {:?}: name already learned from {:?}", path, first);
            stats.failed.push(FailedSource {
                path: path.display().to_string(),
                reason: format!("A file named '{}' was already learned from {}", name, first.display()),
            });
            continue;
        }

        match engine.add_file(path).await {
            IngestOutcome::Added { chunks, embedded } => {
                learned_names.insert(name, path.as_path());
                stats.sources_count += 1;
                stats.chunks_count += chunks as u32;
                stats.embedded_count += embedded as u32;
                stats.bytes_processed += std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            }
            IngestOutcome::Failed { reason } => stats.failed.push(FailedSource {
                path: path.display().to_string(),
                reason,
            }),
        }
    }

    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Learn operation completed: {} sources, {} chunks, {} bytes in {:.2}s ({} failed)",
        stats.sources_count,
        stats.chunks_count,
        stats.bytes_processed,
        stats.duration_secs,
        stats.failed.len()
    );

    Ok(stats)
}

/// Fail unless the base has been learned at least once.
fn ensure_base_exists(workspace: &Path, base_name: &str) -> AppResult<()> {
    if config::get_store_path(workspace, base_name).exists() {
        Ok(())
    } else {
        Err(AppError::Knowledge(format!(
            "Knowledge base '{}' does not exist. Run 'ragdesk learn {} --path <dir>' first.",
            base_name, base_name
        )))
    }
}

/// Ask a question and wait for the whole answer.
pub async fn ask(
    app: &AppConfig,
    base_name: &str,
    query: &str,
    top_k: Option<usize>,
) -> AppResult<QueryResponse> {
    ensure_base_exists(&app.workspace, base_name)?;
    let top_k = resolve_top_k(&app.workspace, base_name, top_k)?;

    tracing::info!("Querying knowledge base '{}' (top-{})", base_name, top_k);

    let engine = open_engine(app, base_name)?;
    Ok(engine.query(query, top_k).await)
}

/// Ask a question and receive the answer as a stream of events.
pub fn ask_stream(
    app: &AppConfig,
    base_name: &str,
    query: &str,
    top_k: Option<usize>,
) -> AppResult<futures::stream::BoxStream<'static, StreamEvent>> {
    ensure_base_exists(&app.workspace, base_name)?;
    let top_k = resolve_top_k(&app.workspace, base_name, top_k)?;

    let engine = open_engine(app, base_name)?;
    Ok(engine.stream_query(query, top_k))
}

fn resolve_top_k(workspace: &Path, base_name: &str, top_k: Option<usize>) -> AppResult<usize> {
    match top_k {
        Some(k) => Ok(k.max(1)),
        None => Ok(config::load_config(workspace, base_name)?.top_k),
    }
}

/// Remove every record of a knowledge base, keeping its config.
pub async fn clear(workspace: &Path, base_name: &str) -> AppResult<()> {
    ensure_base_exists(workspace, base_name)?;

    let store = open_store(workspace, base_name);
    store.write().await.clear()?;

    tracing::info!("Knowledge base '{}' cleared", base_name);
    Ok(())
}

/// Distinct source documents of a knowledge base, in learning order.
pub async fn list_sources(workspace: &Path, base_name: &str) -> AppResult<Vec<String>> {
    ensure_base_exists(workspace, base_name)?;
    let store = open_store(workspace, base_name);
    let sources = store.read().await.sources();
    Ok(sources)
}

/// Get statistics for a knowledge base.
pub async fn stats(workspace: &Path, base_name: &str) -> AppResult<BaseStats> {
    ensure_base_exists(workspace, base_name)?;

    let path = config::get_store_path(workspace, base_name);
    let store_size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    let store = open_store(workspace, base_name);
    let store = store.read().await;

    Ok(BaseStats {
        base_name: base_name.to_string(),
        total_documents: store.metadata().total_documents,
        total_chunks: store.metadata().total_chunks,
        embedded_chunks: store.embedded_count(),
        total_characters: store.total_characters(),
        dimension: store.dimension(),
        created_at: store.metadata().created_at,
        store_size_bytes,
    })
}
