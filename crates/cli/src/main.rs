//! Ragdesk CLI
//!
//! Main entry point for the ragdesk command-line tool.
//! Learns local documents into knowledge bases and answers questions from them.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ClearCommand, LearnCommand, SourcesCommand, StatsCommand};
use ragdesk_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Ragdesk - question answering over local documents
#[derive(Parser, Debug)]
#[command(name = "ragdesk")]
#[command(about = "Question answering over local documents with a local LLM", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RAGDESK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation provider (ollama, mock)
    #[arg(short, long, global = true, env = "RAGDESK_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "RAGDESK_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Learn documents into a knowledge base
    Learn(LearnCommand),

    /// Ask a question against a knowledge base
    Ask(AskCommand),

    /// Show knowledge base statistics
    Stats(StatsCommand),

    /// List the documents a knowledge base was learned from
    Sources(SourcesCommand),

    /// Remove every record from a knowledge base
    Clear(ClearCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;

    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Logs go to stderr; stdout carries answers and events
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Ragdesk starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;
    config.ensure_ragdesk_dir()?;

    let command_name = match &cli.command {
        Commands::Learn(_) => "learn",
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
        Commands::Sources(_) => "sources",
        Commands::Clear(_) => "clear",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Learn(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Sources(cmd) => cmd.execute(&config).await,
        Commands::Clear(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
