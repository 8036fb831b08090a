//! Command handlers for the Ragdesk CLI.

pub mod ask;
pub mod clear;
pub mod learn;
pub mod stats;

pub use ask::AskCommand;
pub use clear::ClearCommand;
pub use learn::LearnCommand;
pub use stats::{SourcesCommand, StatsCommand};
