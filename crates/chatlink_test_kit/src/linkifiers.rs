use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatlink_domain::{ContributedLinkifier, LinkifyContext, LocationAnchor, Part, coalesce_parts};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Replaces whole-word occurrences of configured names with bare location
/// anchors and records every text it was asked to linkify.
///
/// Clones share the record, so a clone kept by the test observes the calls
/// made on the instance handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct StubLinkifier {
    targets: Vec<(String, Url)>,
    cancel: Option<CancellationToken>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl StubLinkifier {
    /// Turns every standalone occurrence of `word` into an anchor to `uri`.
    pub fn resolve(mut self, word: impl Into<String>, uri: Url) -> Self {
        self.targets.push((word.into(), uri));
        self
    }

    /// Fires `token` whenever the linkifier is invoked.
    pub fn cancel_on_call(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Texts passed to the linkifier so far, in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    fn target_at(&self, text: &str, index: usize) -> Option<&(String, Url)> {
        let after_boundary = text[..index]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        if !after_boundary {
            return None;
        }

        let rest = &text[index..];
        self.targets.iter().find(|(word, _)| {
            rest.starts_with(word.as_str())
                && rest[word.len()..]
                    .chars()
                    .next()
                    .is_none_or(|c| !c.is_alphanumeric())
        })
    }
}

#[async_trait]
impl ContributedLinkifier for StubLinkifier {
    async fn linkify(
        &self,
        text: &str,
        _context: &LinkifyContext,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Option<Vec<Part>>> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(text.to_string());
        }
        if let Some(token) = &self.cancel {
            token.cancel();
        }

        let mut parts = Vec::new();
        let mut last = 0;
        let mut index = 0;
        while let Some(c) = text[index..].chars().next() {
            match self.target_at(text, index) {
                Some((word, uri)) => {
                    parts.push(Part::text(&text[last..index]));
                    parts.push(Part::from(LocationAnchor::new(uri.clone())));
                    index += word.len();
                    last = index;
                }
                None => index += c.len_utf8(),
            }
        }

        if parts.is_empty() {
            return Ok(None);
        }
        parts.push(Part::text(&text[last..]));
        Ok(Some(coalesce_parts(parts)))
    }
}

/// A linkifier that fails on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingLinkifier;

#[async_trait]
impl ContributedLinkifier for FailingLinkifier {
    async fn linkify(
        &self,
        _text: &str,
        _context: &LinkifyContext,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Option<Vec<Part>>> {
        anyhow::bail!("linkifier failed on purpose")
    }
}
