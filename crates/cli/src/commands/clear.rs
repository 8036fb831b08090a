//! Clear command handler.

use clap::Args;
use ragdesk_core::{config::AppConfig, AppResult};

/// Remove every record from a knowledge base
#[derive(Args, Debug)]
pub struct ClearCommand {
    /// Knowledge base name
    pub base: String,
}

impl ClearCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clear command for base '{}'", self.base);

        ragdesk_knowledge::clear(&config.workspace, &self.base).await?;

        println!("Knowledge base '{}' cleared", self.base);

        Ok(())
    }
}
