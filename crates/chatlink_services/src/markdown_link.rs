use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chatlink_domain::{ContributedLinkifier, LinkifyContext, LocationAnchor, Part, Range};
use regex::Regex;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::FileInfoInfra;
use crate::utils::{replace_spans, resolve_file};

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\[\]]+)\]\(([^()\s#]+)(?:#L(\d+)(?:-L?(\d+))?)?\)").unwrap()
});

/// A `[label](path#L10-L12)` link found in the text.
#[derive(Debug)]
struct RelativeLink<'a> {
    span: std::ops::Range<usize>,
    label: &'a str,
    path: &'a str,
    range: Option<Range>,
}

fn line_range(start: Option<&str>, end: Option<&str>) -> Option<Range> {
    let one_based = |digits: &str| digits.parse::<u32>().ok().filter(|n| *n > 0);
    let start = start.and_then(one_based)? - 1;
    match end.and_then(one_based).map(|end| end - 1) {
        Some(end) if end > start => Some(Range::lines(start, end)),
        _ => Some(Range::at_line(start)),
    }
}

fn relative_links(text: &str) -> Vec<RelativeLink<'_>> {
    MARKDOWN_LINK
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let path = captures.get(2)?.as_str();
            // Links with a scheme are left to the de-linkify pass.
            if Url::parse(path).is_ok() {
                return None;
            }
            Some(RelativeLink {
                span: whole.range(),
                label: captures.get(1)?.as_str(),
                path,
                range: line_range(
                    captures.get(3).map(|m| m.as_str()),
                    captures.get(4).map(|m| m.as_str()),
                ),
            })
        })
        .collect()
}

/// Turns markdown links to workspace files into titled location anchors,
/// keeping any `#L` line fragment as the anchor range.
pub struct MarkdownLinkLinkifier<F> {
    infra: Arc<F>,
    root: PathBuf,
}

impl<F: FileInfoInfra> MarkdownLinkLinkifier<F> {
    pub fn new(infra: Arc<F>, root: PathBuf) -> Self {
        Self { infra, root }
    }
}

#[async_trait]
impl<F: FileInfoInfra> ContributedLinkifier for MarkdownLinkLinkifier<F> {
    fn name(&self) -> &'static str {
        "markdown_link"
    }

    async fn linkify(
        &self,
        text: &str,
        _context: &LinkifyContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<Vec<Part>>> {
        let mut spans = Vec::new();

        for link in relative_links(text) {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let Some(uri) = resolve_file(self.infra.as_ref(), &self.root, link.path).await? else {
                continue;
            };

            let anchor = LocationAnchor::new(uri).title(link.label);
            let anchor = match link.range {
                Some(range) => anchor.range(range),
                None => anchor,
            };
            spans.push((link.span, Part::from(anchor)));
        }

        Ok(replace_spans(text, spans))
    }
}
