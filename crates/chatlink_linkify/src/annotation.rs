//! Detection of "line N" / "lines N-M" phrases around a file mention.
//!
//! Both parsers are pure: they look at a bounded window of text and report
//! the zero-based line the phrase refers to together with the exact text that
//! was matched. Line numbers in prose are one-based; zero or unparsable
//! numbers never produce a match.

use std::sync::LazyLock;

use regex::Regex;

/// Number of characters inspected after an anchor unless a caller asks for a
/// different window.
const TRAILING_SCAN_WINDOW: usize = 160;

/// Upper bound on tokens produced while scanning trailing text.
const MAX_TOKENS: usize = 40;

const LINE_WORDS: [&str; 4] = ["line", "lines", "ln", "l"];
const CONNECTOR_WORDS: [&str; 3] = ["to", "through", "thru"];

static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\(\s*lines?\s*(\d+)(?:\s*(?:-|–|—|\bto\b|\bthrough\b|\bthru\b)\s*(\d+))?\s*\)")
        .unwrap()
});

static PRECEDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b(?:in|on|at)\s+)?\b(?:lines?|ln|l)\s*(\d+)(?:\s*(?:-|–|—|\bto\b|\bthrough\b|\bthru\b)\s*(\d+))?\s+(?:of|in)\s*$",
    )
    .unwrap()
});

/// A line reference found next to an anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineAnnotation {
    /// Zero-based line the phrase points at.
    pub start_line: u32,
    /// Zero-based last line when the phrase names a complete range.
    pub end_line: Option<u32>,
    /// The exact text that was matched.
    pub raw: String,
}

/// Parses a one-based line number, rejecting zero and anything unparsable.
fn parse_line_number(digits: &str) -> Option<u32> {
    digits
        .parse::<u32>()
        .ok()
        .filter(|line| *line > 0)
        .map(|line| line - 1)
}

fn end_line(start_line: u32, digits: Option<&str>) -> Option<u32> {
    digits
        .and_then(parse_line_number)
        .filter(|end| *end >= start_line)
}

/// Returns the longest prefix of `text` holding at most `max_chars` chars.
pub(crate) fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Number,
    Dash,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

fn is_dash(c: char) -> bool {
    matches!(c, '-' | '–' | '—')
}

/// Splits text into alphabetic runs, digit runs and single dashes. All other
/// characters only separate tokens.
fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if tokens.len() == MAX_TOKENS {
            break;
        }

        let kind = if c.is_alphabetic() {
            TokenKind::Word
        } else if c.is_ascii_digit() {
            TokenKind::Number
        } else if is_dash(c) {
            tokens.push(Token { kind: TokenKind::Dash, start, end: start + c.len_utf8() });
            continue;
        } else {
            continue;
        };

        let mut end = start + c.len_utf8();
        while let Some(&(index, next)) = chars.peek() {
            let same_run = match kind {
                TokenKind::Word => next.is_alphabetic(),
                _ => next.is_ascii_digit(),
            };
            if !same_run {
                break;
            }
            end = index + next.len_utf8();
            chars.next();
        }
        tokens.push(Token { kind, start, end });
    }

    tokens
}

/// Looks for a line reference in the text that immediately follows an anchor,
/// e.g. `" (line 42)"` or `" is defined on lines 10 through 12"`.
///
/// Only the first match is reported.
pub fn parse_trailing_line_number_annotation(text: &str) -> Option<LineAnnotation> {
    parse_trailing_line_number_annotation_within(text, TRAILING_SCAN_WINDOW)
}

/// Same as [`parse_trailing_line_number_annotation`] but inspects at most
/// `max_chars` characters of `text`.
pub fn parse_trailing_line_number_annotation_within(
    text: &str,
    max_chars: usize,
) -> Option<LineAnnotation> {
    let window = take_chars(text, max_chars);

    if let Some(captures) = PARENTHESIZED.captures(window)
        && let Some(start_line) = parse_line_number(&captures[1])
    {
        return Some(LineAnnotation {
            start_line,
            end_line: end_line(start_line, captures.get(2).map(|m| m.as_str())),
            raw: captures[0].to_string(),
        });
    }

    let tokens = tokenize(window);
    let slice = |token: &Token| &window[token.start..token.end];
    let word_is = |token: Option<&Token>, words: &[&str]| {
        token.is_some_and(|token| {
            token.kind == TokenKind::Word
                && words.iter().any(|word| slice(token).eq_ignore_ascii_case(word))
        })
    };

    for (index, token) in tokens.iter().enumerate() {
        if !word_is(Some(token), &LINE_WORDS) {
            continue;
        }
        let Some(number) = tokens.get(index + 1).filter(|t| t.kind == TokenKind::Number) else {
            continue;
        };
        let Some(start_line) = parse_line_number(slice(number)) else {
            continue;
        };

        let connector = tokens.get(index + 2);
        let has_connector = connector.is_some_and(|t| t.kind == TokenKind::Dash)
            || word_is(connector, &CONNECTOR_WORDS);

        let (last, end) = match tokens.get(index + 3) {
            Some(second) if has_connector && second.kind == TokenKind::Number => {
                match end_line(start_line, Some(slice(second))) {
                    Some(end) => (second, Some(end)),
                    None => (&tokens[index + 2], None),
                }
            }
            _ if has_connector => (&tokens[index + 2], None),
            _ => (number, None),
        };

        return Some(LineAnnotation {
            start_line,
            end_line: end,
            raw: window[token.start..last.end].to_string(),
        });
    }

    None
}

/// Looks for a line reference that ends exactly where an anchor begins, e.g.
/// `"see lines 5-7 of "`. Earlier text in `text` is ignored.
pub fn parse_preceding_line_number_annotation(text: &str) -> Option<LineAnnotation> {
    let captures = PRECEDING.captures(text)?;
    let start_line = parse_line_number(&captures[1])?;

    Some(LineAnnotation {
        start_line,
        end_line: end_line(start_line, captures.get(2).map(|m| m.as_str())),
        raw: captures[0].to_string(),
    })
}
