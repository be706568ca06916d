use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chatlink_domain::{ContributedLinkifier, LinkifyContext, LocationAnchor, Part};
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::FileInfoInfra;
use crate::utils::{replace_spans, resolve_file};

static PATH_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_~./\-]+").unwrap());

/// Turns bare mentions of workspace files (`src/main.rs`, `foo.py`) into
/// unresolved location anchors.
///
/// A mention is linked when a context reference ends with it or when it
/// names an existing file under the workspace root.
pub struct FilePathLinkifier<F> {
    infra: Arc<F>,
    root: PathBuf,
}

impl<F: FileInfoInfra> FilePathLinkifier<F> {
    pub fn new(infra: Arc<F>, root: PathBuf) -> Self {
        Self { infra, root }
    }

    async fn resolve(
        &self,
        candidate: &str,
        context: &LinkifyContext,
    ) -> anyhow::Result<Option<Url>> {
        if let Some(reference) = context
            .references
            .iter()
            .find(|reference| matches_reference(reference, candidate))
        {
            return Ok(Some(reference.clone()));
        }
        resolve_file(self.infra.as_ref(), &self.root, candidate).await
    }
}

/// Trims sentence punctuation from a path-like word and checks it looks like
/// a file name with an extension.
fn path_candidate(word: &str) -> Option<&str> {
    let word = word.trim_end_matches(['.', '-', '/']);
    if word.is_empty() || word.contains("//") || word.starts_with('-') {
        return None;
    }

    let path = Path::new(word);
    let extension = path.extension()?.to_str()?;
    let has_stem = path.file_stem().is_some_and(|stem| !stem.is_empty());
    let plausible = extension.chars().all(|c| c.is_ascii_alphanumeric())
        && extension.chars().any(|c| c.is_ascii_alphabetic());

    (has_stem && plausible).then_some(word)
}

fn matches_reference(reference: &Url, candidate: &str) -> bool {
    let candidate = candidate.trim_start_matches("./");
    let path = reference.path();
    path == candidate || path.ends_with(&format!("/{candidate}"))
}

#[async_trait]
impl<F: FileInfoInfra> ContributedLinkifier for FilePathLinkifier<F> {
    fn name(&self) -> &'static str {
        "file_path"
    }

    async fn linkify(
        &self,
        text: &str,
        context: &LinkifyContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<Vec<Part>>> {
        let candidates: Vec<(usize, &str)> = PATH_CANDIDATE
            .find_iter(text)
            .filter_map(|found| path_candidate(found.as_str()).map(|c| (found.start(), c)))
            .collect();

        let mut spans = Vec::new();
        for (start, candidate) in candidates {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            if let Some(uri) = self.resolve(candidate, context).await? {
                debug!(%uri, candidate, "Linked file mention");
                spans.push((start..start + candidate.len(), Part::from(LocationAnchor::new(uri))));
            }
        }

        Ok(replace_spans(text, spans))
    }
}
