//! Ask command handler.
//!
//! Answers a question from a knowledge base, either buffered or streamed
//! token by token. With `--stream --json` every event is printed as one
//! JSON object per line.

use clap::Args;
use futures::StreamExt;
use ragdesk_core::{config::AppConfig, AppResult};
use ragdesk_knowledge::{QueryResponse, SourceRef, StreamEvent};
use std::io::Write;

/// Ask a question against a knowledge base
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Knowledge base name
    pub base: String,

    /// Question text
    pub query: String,

    /// Number of chunks to retrieve (default: the base's top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Print the answer as it is generated
    #[arg(long)]
    pub stream: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command for base '{}'", self.base);

        if self.stream {
            self.handle_streaming(config).await
        } else {
            self.handle_buffered(config).await
        }
    }

    async fn handle_buffered(&self, config: &AppConfig) -> AppResult<()> {
        let response = ragdesk_knowledge::ask(config, &self.base, &self.query, self.top_k).await?;

        tracing::debug!(
            "Answer ready: confidence={:.3}, sources={}",
            response.confidence,
            response.sources.len()
        );

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            print_answer(&response);
        }

        Ok(())
    }

    async fn handle_streaming(&self, config: &AppConfig) -> AppResult<()> {
        let mut events = ragdesk_knowledge::ask_stream(config, &self.base, &self.query, self.top_k)?;

        let mut stdout = std::io::stdout();
        let mut streamed = String::new();
        let mut sources: Vec<SourceRef> = Vec::new();
        let mut confidence = 0.0;

        while let Some(event) = events.next().await {
            if self.json {
                writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
                stdout.flush()?;
                continue;
            }

            match event {
                StreamEvent::Meta {
                    sources: refs,
                    confidence: score,
                } => {
                    sources = refs;
                    confidence = score;
                }
                StreamEvent::Token { text } => {
                    write!(stdout, "{}", text)?;
                    stdout.flush()?;
                    streamed.push_str(&text);
                }
                StreamEvent::Done { response } => {
                    // A terminal message replaces a partial or missing answer
                    if response != streamed {
                        if !streamed.is_empty() {
                            writeln!(stdout)?;
                        }
                        write!(stdout, "{}", response)?;
                    }
                    writeln!(stdout)?;
                }
            }
        }

        if !self.json {
            println!();
            print_sources(&sources, confidence);
        }

        Ok(())
    }
}

fn print_answer(response: &QueryResponse) {
    println!("Answer:");
    println!("{}", response.response);
    println!();
    print_sources(&response.sources, response.confidence);
}

fn print_sources(sources: &[SourceRef], confidence: f32) {
    if sources.is_empty() {
        println!("Sources: (no sources available)");
    } else {
        println!("Sources:");
        for source in sources {
            println!(
                "- {} (chunk {}, similarity {:.3})",
                source.file, source.chunk_id, source.similarity
            );
        }
    }
    println!("Confidence: {:.3}", confidence);
}
