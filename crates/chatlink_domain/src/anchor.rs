use std::fmt;

use derive_more::From;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use url::Url;

/// A zero-based line/character position inside a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-width range at the first character of `line`.
    pub fn at_line(line: u32) -> Self {
        let position = Position::new(line, 0);
        Self::new(position, position)
    }

    /// Range covering whole lines `start..=end`, both zero-based.
    pub fn lines(start: u32, end: u32) -> Self {
        Self::new(Position::new(start, 0), Position::new(end, 0))
    }
}

/// A resource together with a range inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub uri: Url,
    pub range: Range,
}

impl Location {
    pub fn new(uri: Url, range: Range) -> Self {
        Self { uri, range }
    }
}

/// Anchor pointing at a resource, optionally narrowed to a range.
///
/// An anchor without a range is *unresolved*: the engine may still upgrade it
/// with a line number found in the surrounding prose. Upgrading never mutates
/// an existing value; [`LocationAnchor::resolved_at_line`] builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Setters, Serialize, Deserialize)]
#[setters(strip_option, into)]
pub struct LocationAnchor {
    pub uri: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    /// Display text shown in place of the anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl LocationAnchor {
    pub fn new(uri: Url) -> Self {
        Self { uri, range: None, title: None }
    }

    pub fn is_resolved(&self) -> bool {
        self.range.is_some()
    }

    /// Returns a copy of this anchor pointing at the start of `line`.
    pub fn resolved_at_line(&self, line: u32) -> Self {
        self.clone().range(Range::at_line(line))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    File,
    Module,
    Class,
    Struct,
    Enum,
    Trait,
    Interface,
    Method,
    Function,
    Field,
    Variable,
    Constant,
}

/// Anchor pointing at a named symbol and its defining location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolAnchor {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
}

impl SymbolAnchor {
    pub fn new(name: impl Into<String>, kind: SymbolKind, location: Location) -> Self {
        Self { name: name.into(), kind, location }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, From, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Anchor {
    Location(LocationAnchor),
    Symbol(SymbolAnchor),
}

impl Anchor {
    /// Symbol anchors always carry a position; location anchors only once a
    /// range is known.
    pub fn is_resolved(&self) -> bool {
        match self {
            Anchor::Location(anchor) => anchor.is_resolved(),
            Anchor::Symbol(_) => true,
        }
    }

    pub fn as_location(&self) -> Option<&LocationAnchor> {
        match self {
            Anchor::Location(anchor) => Some(anchor),
            Anchor::Symbol(_) => None,
        }
    }
}

fn with_line_fragment(uri: &Url, range: Option<&Range>) -> Url {
    let mut uri = uri.clone();
    match range {
        Some(range) if range.end.line > range.start.line => {
            let fragment = format!("L{}-L{}", range.start.line + 1, range.end.line + 1);
            uri.set_fragment(Some(&fragment));
        }
        Some(range) => uri.set_fragment(Some(&format!("L{}", range.start.line + 1))),
        None => {}
    }
    uri
}

fn file_name(uri: &Url) -> &str {
    uri.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or(uri.as_str())
}

/// Renders the anchor as a markdown link with a `#L` fragment.
impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Location(anchor) => {
                let title = anchor.title.as_deref().unwrap_or_else(|| file_name(&anchor.uri));
                let target = with_line_fragment(&anchor.uri, anchor.range.as_ref());
                write!(f, "[{title}]({target})")
            }
            Anchor::Symbol(anchor) => {
                let target =
                    with_line_fragment(&anchor.location.uri, Some(&anchor.location.range));
                write!(f, "[`{}`]({target})", anchor.name)
            }
        }
    }
}
