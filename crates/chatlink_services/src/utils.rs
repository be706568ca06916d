use std::path::{Component, Path};

use chatlink_domain::{Part, coalesce_parts};
use url::Url;

use crate::FileInfoInfra;

/// Replaces the given byte spans of `text` with parts. Spans must be sorted
/// and must not overlap. Returns `None` when there is nothing to replace.
pub(crate) fn replace_spans(
    text: &str,
    spans: Vec<(std::ops::Range<usize>, Part)>,
) -> Option<Vec<Part>> {
    if spans.is_empty() {
        return None;
    }

    let mut parts = Vec::with_capacity(spans.len() * 2 + 1);
    let mut last = 0;
    for (span, part) in spans {
        parts.push(Part::text(&text[last..span.start]));
        parts.push(part);
        last = span.end;
    }
    parts.push(Part::text(&text[last..]));
    Some(coalesce_parts(parts))
}

/// Resolves `candidate` against `root` and returns its `file://` URI when it
/// names an existing file. Absolute paths and paths climbing out of `root`
/// are never resolved.
pub(crate) async fn resolve_file<F: FileInfoInfra>(
    infra: &F,
    root: &Path,
    candidate: &str,
) -> anyhow::Result<Option<Url>> {
    let relative = Path::new(candidate);
    let escapes = relative.components().any(|component| {
        matches!(component, Component::ParentDir | Component::RootDir | Component::Prefix(_))
    });
    if escapes {
        return Ok(None);
    }

    let path = root.join(relative);
    if !infra.is_file(&path).await? {
        return Ok(None);
    }

    let uri = Url::from_file_path(&path)
        .map_err(|_| anyhow::anyhow!("Failed to convert '{}' into a file URI", path.display()))?;
    Ok(Some(uri))
}
