//! Learn command handler.

use clap::Args;
use ragdesk_core::{config::AppConfig, AppResult};
use ragdesk_knowledge::LearnOptions;
use std::path::PathBuf;

/// Learn documents into a knowledge base
#[derive(Args, Debug)]
pub struct LearnCommand {
    /// Knowledge base name
    pub base: String,

    /// Files or directories to learn from
    #[arg(long, required = true)]
    pub path: Vec<PathBuf>,

    /// Only learn paths containing this text (repeatable)
    #[arg(long)]
    pub include: Vec<String>,

    /// Skip paths containing this text (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Clear the base before learning
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl LearnCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing learn command for base '{}'", self.base);

        let options = LearnOptions {
            base_name: self.base.clone(),
            paths: self.path.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            reset: self.reset,
        };

        let stats = ragdesk_knowledge::learn(config, options).await?;

        if self.json {
            let output = serde_json::json!({
                "base": self.base,
                "sourcesCount": stats.sources_count,
                "chunksCount": stats.chunks_count,
                "embeddedCount": stats.embedded_count,
                "bytesProcessed": stats.bytes_processed,
                "failed": stats.failed,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Learned {} sources ({} chunks, {} embedded, {} bytes) in {:.2}s",
                stats.sources_count,
                stats.chunks_count,
                stats.embedded_count,
                stats.bytes_processed,
                stats.duration_secs
            );
            for failed in &stats.failed {
                println!("  skipped {}: {}", failed.path, failed.reason);
            }
        }

        Ok(())
    }
}
