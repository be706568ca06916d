use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// URI scheme the product uses for its own links. Links with this scheme are
/// never stripped by the de-linkify pass.
pub const DEFAULT_SCHEME: &str = "chatlink";

/// Tunables for the anchor buffering stage of the response linkifier.
#[derive(Debug, Clone, PartialEq, Eq, Setters, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[setters(into)]
pub struct LinkifyConfig {
    /// Maximum number of characters of already emitted text scanned for a
    /// preceding "in lines N-M of" annotation.
    pub preceding_window: usize,
    /// Maximum number of characters after an anchor scanned for a trailing
    /// "(line N)" annotation.
    pub trailing_window: usize,
    /// A buffered anchor is released once more than this many characters of
    /// trailing text have been collected.
    pub trailing_flush_chars: usize,
    pub scheme: String,
}

impl Default for LinkifyConfig {
    fn default() -> Self {
        Self {
            preceding_window: 160,
            trailing_window: 160,
            trailing_flush_chars: 140,
            scheme: DEFAULT_SCHEME.to_string(),
        }
    }
}
