//! Token re-assembly for streamed responses.
//!
//! Chunks arrive with arbitrary boundaries, so a fence, an inline code span or
//! a markdown link label may be split across several `append` calls. The
//! state machine below decides, run by run, when a unit of text is complete
//! and whether it may be linkified at all. Transitions are pure: they consume
//! the current state and return the next one together with the actions the
//! engine has to perform.

/// Splits text into alternating runs of whitespace and non-whitespace.
pub fn split_runs(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let whitespace = first.is_whitespace();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace() != whitespace)
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        rest = tail;
        Some(run)
    })
}

fn is_whitespace_run(part: &str) -> bool {
    part.chars().all(char::is_whitespace)
}

/// Text after the last newline of `text`.
pub fn last_line(text: &str) -> &str {
    match text.rfind('\n') {
        Some(index) => &text[index + 1..],
        None => text,
    }
}

/// Splits a line into its leading spaces/tabs and the remainder.
fn split_indent(line: &str) -> (&str, &str) {
    let rest = line.trim_start_matches([' ', '\t']);
    line.split_at(line.len() - rest.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationKind {
    Word,
    InlineCodeOrMath,
    PotentialLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Default,
    /// Inside a fenced code or math block. `contents` holds the block text
    /// seen so far; it is released verbatim when the block closes.
    CodeOrMathBlock {
        fence: String,
        indent: String,
        contents: String,
    },
    /// Collecting the characters of a candidate token.
    Accumulating {
        pending: String,
        kind: AccumulationKind,
        /// Closing delimiter of an inline code or math span.
        terminator: Option<String>,
    },
}

/// Work the engine performs after a transition, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Emit text unchanged, bypassing the linkifier pipeline.
    Emit(String),
    /// Run the text through the linkifier pipeline.
    Linkify { text: String, skip_delinkify: bool },
    /// Feed the text back through the state machine before any later run.
    Reprocess(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: State,
    pub actions: Vec<Action>,
}

impl Transition {
    fn new(state: State, actions: Vec<Action>) -> Self {
        Self { state, actions }
    }

    fn stay(state: State) -> Self {
        Self::new(state, Vec::new())
    }

    fn linkify(text: String, skip_delinkify: bool) -> Self {
        Self::new(State::Default, vec![Action::Linkify { text, skip_delinkify }])
    }

    fn accumulate(pending: impl Into<String>, kind: AccumulationKind) -> Self {
        Self::stay(State::Accumulating { pending: pending.into(), kind, terminator: None })
    }
}

/// How a line opens a fenced block, if it does.
#[derive(Debug, PartialEq, Eq)]
enum Opening<'a> {
    Fence(&'a str),
    /// `$$...$$` on a single line.
    DisplayMath,
}

fn opening_fence(line: &str) -> Option<Opening<'_>> {
    let marker = line.chars().next()?;
    match marker {
        '`' | '~' => {
            let run = line.len() - line.trim_start_matches(marker).len();
            let info = &line[run..];
            // Backtick fences may not carry backticks in their info string.
            (run >= 3 && !(marker == '`' && info.contains('`'))).then(|| Opening::Fence(&line[..run]))
        }
        '$' if line.starts_with("$$") => {
            if line[2..].contains("$$") {
                Some(Opening::DisplayMath)
            } else {
                Some(Opening::Fence("$$"))
            }
        }
        _ => None,
    }
}

/// Whether `text`, appended to the emitted `line`, would start that line with
/// a fence opener.
fn opens_fence(line: &str, text: &str) -> bool {
    let candidate = format!("{line}{text}");
    let (_, rest) = split_indent(last_line(&candidate));
    opening_fence(rest).is_some()
}

fn is_closing_fence(candidate: &str, fence: &str) -> bool {
    let Some(marker) = fence.chars().next() else {
        return false;
    };
    let run = candidate.len() - candidate.trim_start_matches(marker).len();
    run >= fence.len() && run == candidate.len()
}

/// The kind of inline span a run opens.
#[derive(Debug, PartialEq, Eq)]
enum InlineSpan {
    Code { complete: bool, terminator: String },
    Math { close: Option<usize> },
}

fn inline_span(part: &str) -> Option<InlineSpan> {
    if let Some(rest) = part.strip_prefix('$') {
        let next = rest.chars().next()?;
        if next.is_ascii_digit() || next == '$' {
            return None;
        }
        return Some(InlineSpan::Math { close: rest.find('$').map(|index| index + 1) });
    }

    let open = part.find('`')?;
    if part[..open].contains('[') {
        return None;
    }
    let after_open = &part[open..];
    let ticks = after_open.len() - after_open.trim_start_matches('`').len();
    if ticks >= 3 {
        return None;
    }

    let terminator = "`".repeat(ticks);
    let mut rest = &after_open[ticks..];
    let mut complete = false;
    while let Some(index) = rest.find('`') {
        let run = &rest[index..];
        let len = run.len() - run.trim_start_matches('`').len();
        if len == ticks {
            complete = true;
            break;
        }
        rest = &run[len..];
    }
    Some(InlineSpan::Code { complete, terminator })
}

/// Whether appending the whitespace run `part` to `pending` leaves a blank
/// line at the end.
fn ends_paragraph(pending: &str, part: &str) -> bool {
    if !is_whitespace_run(part) {
        return false;
    }
    let trailing = &pending[pending.trim_end().len()..];
    trailing.matches('\n').count() + part.matches('\n').count() >= 2
}

fn is_potential_link(part: &str) -> bool {
    part.starts_with('[') && !part.contains(']')
}

impl State {
    /// Advances the machine by one run of text.
    ///
    /// `line` is the already emitted text since the last newline; it decides
    /// whether a fence starts at the beginning of a line and how far it is
    /// indented.
    pub fn advance(self, part: &str, line: &str) -> Transition {
        if part.is_empty() {
            return Transition::stay(self);
        }

        match self {
            State::Default => Self::start(part, line),
            State::CodeOrMathBlock { fence, indent, mut contents } => {
                if !is_whitespace_run(part) {
                    let candidate = format!("{line}{contents}{part}");
                    let (candidate_indent, rest) = split_indent(last_line(&candidate));
                    if candidate_indent.len() <= indent.len() && is_closing_fence(rest, &fence) {
                        contents.push_str(part);
                        return Transition::new(State::Default, vec![Action::Emit(contents)]);
                    }
                }
                contents.push_str(part);
                Transition::stay(State::CodeOrMathBlock { fence, indent, contents })
            }
            State::Accumulating { mut pending, kind, terminator } => match kind {
                // A backtick fence split across chunks first looks like inline code.
                AccumulationKind::InlineCodeOrMath
                    if terminator.as_deref() != Some("$")
                        && opens_fence(line, &format!("{pending}{part}")) =>
                {
                    pending.push_str(part);
                    Transition::accumulate(pending, AccumulationKind::Word)
                }
                // Inline spans never cross a paragraph break.
                AccumulationKind::InlineCodeOrMath if ends_paragraph(&pending, part) => {
                    pending.push_str(part);
                    Transition::linkify(pending, true)
                }
                AccumulationKind::PotentialLink if part.contains(']') => {
                    pending.push_str(part);
                    Transition::accumulate(pending, AccumulationKind::Word)
                }
                AccumulationKind::PotentialLink if part.contains('\n') => {
                    pending.push_str(part);
                    Transition::linkify(pending, true)
                }
                AccumulationKind::InlineCodeOrMath
                    if terminator.as_deref().is_some_and(|t| part.contains(t)) =>
                {
                    let terminator = terminator.unwrap_or_default();
                    if terminator == "$" {
                        let split = part.find('$').map(|index| index + 1).unwrap_or(part.len());
                        pending.push_str(&part[..split]);
                        let mut actions = vec![Action::Emit(pending)];
                        if split < part.len() {
                            actions.push(Action::Reprocess(part[split..].to_string()));
                        }
                        Transition::new(State::Default, actions)
                    } else {
                        pending.push_str(part);
                        Transition::linkify(pending, true)
                    }
                }
                AccumulationKind::Word if is_whitespace_run(part) => {
                    Self::complete_word(pending, part, line)
                }
                _ => {
                    pending.push_str(part);
                    Transition::stay(State::Accumulating { pending, kind, terminator })
                }
            },
        }
    }

    fn start(part: &str, line: &str) -> Transition {
        if is_whitespace_run(part) {
            return Transition::new(State::Default, vec![Action::Emit(part.to_string())]);
        }

        if opening_fence(part).is_some() || opens_fence(line, part) {
            return Transition::accumulate(part, AccumulationKind::Word);
        }

        match inline_span(part) {
            Some(InlineSpan::Code { complete: true, .. }) => {
                Transition::linkify(part.to_string(), true)
            }
            Some(InlineSpan::Code { complete: false, terminator }) => {
                Transition::stay(State::Accumulating {
                    pending: part.to_string(),
                    kind: AccumulationKind::InlineCodeOrMath,
                    terminator: Some(terminator),
                })
            }
            Some(InlineSpan::Math { close: Some(close) }) => {
                let mut actions = vec![Action::Emit(part[..=close].to_string())];
                if close + 1 < part.len() {
                    actions.push(Action::Reprocess(part[close + 1..].to_string()));
                }
                Transition::new(State::Default, actions)
            }
            Some(InlineSpan::Math { close: None }) => Transition::stay(State::Accumulating {
                pending: part.to_string(),
                kind: AccumulationKind::InlineCodeOrMath,
                terminator: Some("$".to_string()),
            }),
            None if is_potential_link(part) => {
                Transition::accumulate(part, AccumulationKind::PotentialLink)
            }
            None => Transition::accumulate(part, AccumulationKind::Word),
        }
    }

    /// Completes a word once the whitespace after it (possibly none, at the
    /// end of a chunk) is known.
    fn complete_word(mut pending: String, whitespace: &str, line: &str) -> Transition {
        let candidate = format!("{line}{pending}");
        let (indent, rest) = split_indent(last_line(&candidate));
        let opening = opening_fence(rest);
        let indent = indent.to_string();
        pending.push_str(whitespace);

        match opening {
            Some(Opening::Fence(fence)) => Transition::new(
                State::CodeOrMathBlock { fence: fence.to_string(), indent, contents: String::new() },
                vec![Action::Emit(pending)],
            ),
            Some(Opening::DisplayMath) => {
                Transition::new(State::Default, vec![Action::Emit(pending)])
            }
            None => Transition::linkify(pending, false),
        }
    }

    /// Called when an `append` call has consumed its chunk. A pending word is
    /// finalized so that trailing annotation text reaches the buffering stage
    /// without waiting for the next chunk.
    pub fn end_of_chunk(self, line: &str) -> Transition {
        match self {
            State::Accumulating { pending, kind: AccumulationKind::Word, .. } => {
                Self::complete_word(pending, "", line)
            }
            state => Transition::stay(state),
        }
    }

    /// Releases everything still held when the response ends.
    pub fn drain(self) -> Vec<Action> {
        match self {
            State::Default => Vec::new(),
            State::CodeOrMathBlock { contents, .. } => vec![Action::Emit(contents)],
            State::Accumulating { pending, kind, .. } => vec![Action::Linkify {
                text: pending,
                skip_delinkify: kind != AccumulationKind::Word,
            }],
        }
    }
}
