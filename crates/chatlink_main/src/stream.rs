use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chatlink_domain::{ContributedLinkifier, Part};
use chatlink_linkify::ResponseLinkifier;
use chatlink_services::{FileInfoInfra, FilePathLinkifier, MarkdownLinkLinkifier, SymbolLinkifier};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::OutputFormat;

/// Linkifiers used by the CLI, in the order they run.
pub fn default_linkifiers<F: FileInfoInfra + 'static>(
    infra: Arc<F>,
    root: PathBuf,
) -> Vec<Arc<dyn ContributedLinkifier>> {
    vec![
        Arc::new(MarkdownLinkLinkifier::new(infra.clone(), root.clone())),
        Arc::new(SymbolLinkifier),
        Arc::new(FilePathLinkifier::new(infra, root)),
    ]
}

/// Converts reference paths, relative to `root`, into `file://` URIs.
pub fn reference_uris(root: &Path, paths: &[PathBuf]) -> anyhow::Result<Vec<Url>> {
    paths
        .iter()
        .map(|path| {
            let path = root.join(path);
            Url::from_file_path(&path)
                .map_err(|_| anyhow::anyhow!("Invalid reference path '{}'", path.display()))
        })
        .collect()
}

/// Splits `text` into chunks of roughly `size` characters. A chunk is
/// extended to the next whitespace so that no word is cut in half.
fn chunks(text: &str, size: usize) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(size)
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        let end = end + rest[end..].find(char::is_whitespace).unwrap_or(rest.len() - end);
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub chunks: usize,
    pub parts: usize,
    pub anchors: usize,
}

/// Writes parts as they are produced, either as markdown or as JSON lines.
pub struct ResponseWriter<W> {
    format: OutputFormat,
    writer: W,
    summary: Summary,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(format: OutputFormat, writer: W) -> Self {
        Self { format, writer, summary: Summary::default() }
    }

    pub fn write(&mut self, parts: &[Part]) -> anyhow::Result<()> {
        for part in parts {
            match self.format {
                OutputFormat::Text => write!(self.writer, "{part}")?,
                OutputFormat::Json => {
                    let line = serde_json::to_string(part)?;
                    writeln!(self.writer, "{line}")?;
                }
            }
            self.summary.parts += 1;
            if part.as_anchor().is_some() {
                self.summary.anchors += 1;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Feeds `input` to `engine` in chunks of `chunk_size` characters, writing
/// everything the engine releases.
pub async fn linkify_stream<W: Write>(
    engine: &mut ResponseLinkifier,
    input: &str,
    chunk_size: usize,
    writer: &mut ResponseWriter<W>,
    cancel: &CancellationToken,
) -> anyhow::Result<Summary> {
    for chunk in chunks(input, chunk_size) {
        let parts = engine
            .append(chunk, cancel)
            .await
            .context("Failed to linkify response chunk")?;
        writer.write(&parts)?;
        writer.summary.chunks += 1;
    }

    if let Some(parts) = engine
        .flush(cancel)
        .await
        .context("Failed to flush response")?
    {
        writer.write(&parts)?;
    }

    Ok(writer.summary)
}
