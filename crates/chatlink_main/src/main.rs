use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chatlink_domain::LinkifyContext;
use chatlink_infra::{ChatlinkEnvironment, ChatlinkFileMeta};
use chatlink_linkify::ResponseLinkifier;
use chatlink_main::{Cli, ResponseWriter, default_linkifiers, linkify_stream, reference_uris};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so stdout only carries the linkified response.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read '{}'", path.display())),
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd: PathBuf = match &cli.directory {
        Some(directory) => directory
            .canonicalize()
            .with_context(|| format!("Invalid directory: {}", directory.display()))?,
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    let environment = ChatlinkEnvironment::new(cwd.clone());
    let config = environment.get();
    let input = read_input(cli.file.as_deref()).await?;

    let context = LinkifyContext::default().references(reference_uris(&cwd, &cli.references)?);
    let linkifiers = default_linkifiers(Arc::new(ChatlinkFileMeta::new()), cwd);
    let mut engine = ResponseLinkifier::with_config(linkifiers, context, config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling linkification");
            on_interrupt.cancel();
        }
    });

    let mut writer = ResponseWriter::new(cli.format, std::io::stdout().lock());
    let chunk_size = usize::try_from(cli.chunk_size).unwrap_or(usize::MAX);
    let summary = linkify_stream(&mut engine, &input, chunk_size, &mut writer, &cancel).await?;

    info!(
        chunks = summary.chunks,
        parts = summary.parts,
        anchors = summary.anchors,
        "Linkified response"
    );
    Ok(())
}
