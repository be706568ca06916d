use async_trait::async_trait;
use derive_setters::Setters;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{Part, SymbolAnchor};

/// Caller supplied data handed unchanged to every contributed linkifier.
///
/// The response linkifier never looks inside; it only passes the context
/// through to the linkifiers it was constructed with.
#[derive(Debug, Clone, Default, PartialEq, Setters)]
#[setters(strip_option, into)]
pub struct LinkifyContext {
    /// Identifier of the chat request the response belongs to.
    pub request_id: Option<String>,
    /// Resources attached to the request, used to resolve bare file names.
    pub references: Vec<Url>,
    /// Symbols known to the request, used to resolve inline code spans.
    pub symbols: Vec<SymbolAnchor>,
}

/// A pluggable component that rewrites plain text into text and anchors.
///
/// Linkifiers run in registration order. Each one only ever sees the text
/// parts left over by the linkifiers before it.
#[async_trait]
pub trait ContributedLinkifier: Send + Sync {
    /// Name used when logging failures.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Rewrites `text` into a list of parts.
    ///
    /// Returns `Ok(None)` when there is nothing to rewrite. Errors are logged
    /// by the caller and treated the same as `Ok(None)`.
    async fn linkify(
        &self,
        text: &str,
        context: &LinkifyContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<Vec<Part>>>;
}
