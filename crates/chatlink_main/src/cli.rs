use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Response file to linkify. Reads stdin when omitted.
    pub file: Option<PathBuf>,

    /// Workspace root that file mentions are resolved against.
    ///
    /// Defaults to the current directory. `.env` files between the
    /// filesystem root and this directory are loaded as well.
    #[arg(long, short = 'C')]
    pub directory: Option<PathBuf>,

    /// Number of characters fed to the linkifier per chunk.
    #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: u64,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// File attached to the request. Mentions of its name are linked even
    /// when it lives outside the workspace.
    #[arg(long = "reference", short = 'r')]
    pub references: Vec<PathBuf>,

    /// Enable verbose logging output.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Markdown with anchors rendered as links.
    #[default]
    Text,
    /// One JSON object per part.
    Json,
}
