use std::sync::{Arc, LazyLock};

use chatlink_domain::{ContributedLinkifier, Error, LinkifyContext, Part, Result, coalesce_parts};
use regex::{Captures, Regex};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

/// Schemes a markdown link may use and still be kept by the de-linkify pass.
const LINKABLE_SCHEMES: [&str; 6] = ["http", "https", "mailto", "file", "vscode", "command"];

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]\(([^()\s]*)\)").unwrap());

/// The ordered list of contributed linkifiers applied to one finalized unit
/// of text.
#[derive(Clone)]
pub struct LinkifierPipeline {
    linkifiers: Vec<Arc<dyn ContributedLinkifier>>,
    scheme: String,
}

impl LinkifierPipeline {
    /// `scheme` is the product's own URI scheme, exempt from de-linkify.
    pub fn new(linkifiers: Vec<Arc<dyn ContributedLinkifier>>, scheme: impl Into<String>) -> Self {
        Self { linkifiers, scheme: scheme.into() }
    }

    /// Runs every linkifier over the text parts of `text`, in order.
    ///
    /// A linkifier that fails leaves its input untouched. Cancellation is
    /// checked before every linkifier invocation and once more at the end.
    pub async fn run(
        &self,
        text: &str,
        context: &LinkifyContext,
        skip_delinkify: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Part>> {
        let mut parts = coalesce_parts([Part::text(text)]);

        for linkifier in &self.linkifiers {
            let mut next = Vec::with_capacity(parts.len());
            for part in parts {
                let Part::Text(text) = part else {
                    next.push(part);
                    continue;
                };

                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }

                match linkifier.linkify(&text, context, cancel).await {
                    Ok(Some(revised)) => next.extend(revised),
                    Ok(None) => next.push(Part::Text(text)),
                    Err(error) => {
                        warn!(linkifier = linkifier.name(), error = ?error, "Linkifier failed");
                        next.push(Part::Text(text));
                    }
                }
            }
            parts = coalesce_parts(next);
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if skip_delinkify {
            return Ok(parts);
        }

        Ok(parts
            .into_iter()
            .map(|part| match part {
                Part::Text(text) => Part::Text(self.delinkify(&text)),
                anchor => anchor,
            })
            .collect())
    }

    fn is_linkable(&self, target: &str) -> bool {
        Url::parse(target).is_ok_and(|url| {
            url.scheme() == self.scheme || LINKABLE_SCHEMES.contains(&url.scheme())
        })
    }

    /// Replaces `[text](target)` with `text` when `target` cannot be opened.
    pub fn delinkify(&self, text: &str) -> String {
        MARKDOWN_LINK
            .replace_all(text, |captures: &Captures| {
                if self.is_linkable(&captures[2]) {
                    captures[0].to_string()
                } else {
                    captures[1].to_string()
                }
            })
            .into_owned()
    }
}
