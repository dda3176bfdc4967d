//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::warn;

use crate::cli::commands::{
    batch::BatchArgs, call::CallArgs, cases::CasesArgs, completions::CompletionsArgs,
    init::InitArgs, new::NewCommands, team::TeamCommands,
};
use crate::core::Config;

#[derive(Parser)]
#[command(name = "casebook")]
#[command(author, version, about = "Permission-checked RPC core for test cases")]
#[command(long_about = "Mutate test cases and their tags, components and notification lists \
through the TestCase.* RPC methods, authorized against a team roster.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format (default: config `default_format`, else auto)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .casebook/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Act as this roster user (default: config `user` or CASEBOOK_USER)
    #[arg(long, short = 'u', global = true)]
    pub user: Option<String>,
}

impl GlobalOpts {
    /// Fill in `--format` from config `default_format` when it was not passed
    pub fn apply_config(&mut self, config: &Config) {
        if self.format.is_some() {
            return;
        }
        if let Some(name) = config.default_format.as_deref() {
            match OutputFormat::from_str(name, true) {
                Ok(format) => self.format = Some(format),
                Err(_) => warn!(default_format = name, "ignoring unknown default_format"),
            }
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new casebook project
    Init(InitArgs),

    /// Invoke one RPC method
    Call(CallArgs),

    /// Invoke RPC requests read as JSON lines
    Batch(BatchArgs),

    /// Create products, categories, components, tags and test cases
    #[command(subcommand)]
    New(NewCommands),

    /// List test cases matching filter criteria
    Cases(CasesArgs),

    /// Team roster management
    #[command(subcommand)]
    Team(TeamCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table for listings, JSON for call results
    #[default]
    Auto,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
    /// Markdown-style table
    Table,
    /// Just IDs, one per line
    Id,
}
