use std::sync::LazyLock;

use async_trait::async_trait;
use chatlink_domain::{ContributedLinkifier, LinkifyContext, Part};
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::utils::replace_spans;

static INLINE_CODE_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([A-Za-z_][\w:.]*)(?:\(\))?`").unwrap());

/// Turns inline code spans that name a symbol known to the request, such as
/// `` `parse_config` `` or `` `Config::new()` ``, into symbol anchors.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolLinkifier;

#[async_trait]
impl ContributedLinkifier for SymbolLinkifier {
    fn name(&self) -> &'static str {
        "symbol"
    }

    async fn linkify(
        &self,
        text: &str,
        context: &LinkifyContext,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Option<Vec<Part>>> {
        if context.symbols.is_empty() {
            return Ok(None);
        }

        let spans = INLINE_CODE_SYMBOL
            .captures_iter(text)
            .filter_map(|captures| {
                let name = captures.get(1)?.as_str();
                let symbol = context.symbols.iter().find(|symbol| symbol.name == name)?;
                Some((captures.get(0)?.range(), Part::from(symbol.clone())))
            })
            .collect();

        Ok(replace_spans(text, spans))
    }
}
