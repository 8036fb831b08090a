//! Stats and sources command handlers.

use clap::Args;
use ragdesk_core::{config::AppConfig, AppResult};

/// Show knowledge base statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Knowledge base name
    pub base: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command for base '{}'", self.base);

        let stats = ragdesk_knowledge::stats(&config.workspace, &self.base).await?;

        if self.json {
            let output = serde_json::json!({
                "base": stats.base_name,
                "totalDocuments": stats.total_documents,
                "totalChunks": stats.total_chunks,
                "embeddedChunks": stats.embedded_chunks,
                "totalCharacters": stats.total_characters,
                "dimension": stats.dimension,
                "createdAt": stats.created_at.to_rfc3339(),
                "storeSizeBytes": stats.store_size_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Knowledge Base: {}", stats.base_name);
            println!("  Documents:  {}", stats.total_documents);
            println!(
                "  Chunks:     {} ({} embedded)",
                stats.total_chunks, stats.embedded_chunks
            );
            println!("  Characters: {}", stats.total_characters);
            match stats.dimension {
                Some(dimension) => println!("  Dimension:  {}", dimension),
                None => println!("  Dimension:  -"),
            }
            println!("  Created:    {}", stats.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("  Store size: {} bytes", stats.store_size_bytes);
        }

        Ok(())
    }
}

/// List the documents a knowledge base was learned from
#[derive(Args, Debug)]
pub struct SourcesCommand {
    /// Knowledge base name
    pub base: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SourcesCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Listing sources of base '{}'", self.base);

        let sources = ragdesk_knowledge::list_sources(&config.workspace, &self.base).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&sources)?);
        } else if sources.is_empty() {
            println!("Knowledge base '{}' has no documents", self.base);
        } else {
            for source in &sources {
                println!("{}", source);
            }
        }

        Ok(())
    }
}
