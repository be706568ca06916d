use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Anchor, LocationAnchor, SymbolAnchor};

/// One fragment of a linkified response: either plain text or an anchor.
///
/// Concatenating the text parts of a sequence, with every anchor replaced by
/// the text it was created from, reproduces the original response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    Anchor(Anchor),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            Part::Anchor(_) => None,
        }
    }

    pub fn as_anchor(&self) -> Option<&Anchor> {
        match self {
            Part::Text(_) => None,
            Part::Anchor(anchor) => Some(anchor),
        }
    }
}

impl From<&str> for Part {
    fn from(text: &str) -> Self {
        Part::Text(text.to_string())
    }
}

impl From<String> for Part {
    fn from(text: String) -> Self {
        Part::Text(text)
    }
}

impl From<Anchor> for Part {
    fn from(anchor: Anchor) -> Self {
        Part::Anchor(anchor)
    }
}

impl From<LocationAnchor> for Part {
    fn from(anchor: LocationAnchor) -> Self {
        Part::Anchor(anchor.into())
    }
}

impl From<SymbolAnchor> for Part {
    fn from(anchor: SymbolAnchor) -> Self {
        Part::Anchor(anchor.into())
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Text(text) => f.write_str(text),
            Part::Anchor(anchor) => anchor.fmt(f),
        }
    }
}

/// Merges adjacent text parts and drops empty ones.
pub fn coalesce_parts(parts: impl IntoIterator<Item = Part>) -> Vec<Part> {
    let mut out: Vec<Part> = Vec::new();
    for part in parts {
        match part {
            Part::Text(text) if text.is_empty() => {}
            Part::Text(text) => match out.last_mut() {
                Some(Part::Text(previous)) => previous.push_str(&text),
                _ => out.push(Part::Text(text)),
            },
            part => out.push(part),
        }
    }
    out
}

/// Concatenated plain text of `parts`, ignoring anchors.
pub fn plain_text(parts: &[Part]) -> String {
    parts.iter().filter_map(Part::as_text).collect()
}
