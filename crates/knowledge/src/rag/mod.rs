//! RAG (Retrieval-Augmented Generation) answering system.
//!
//! Provides natural language answering over knowledge bases using LLM synthesis,
//! either buffered or as a stream of events.

pub mod engine;
pub mod prompt;
pub mod types;

pub use engine::{IngestOutcome, RagEngine, Retrieval, SharedStore};
pub use types::{QueryResponse, SourceRef, StreamEvent};
