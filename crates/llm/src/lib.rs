//! Generation collaborator crate for Ragdesk.
//!
//! This crate provides a provider-agnostic abstraction over the generative
//! model that turns a context-augmented prompt into an answer, either as one
//! buffered completion or as a stream of text fragments.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **Mock**: Scripted fragments for tests and offline demos
//!
//! # Example
//! ```no_run
//! use ragdesk_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2:3b");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::create_client;
pub use providers::{MockClient, OllamaClient};
pub use types::ProviderType;
