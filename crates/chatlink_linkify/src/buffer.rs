use std::sync::LazyLock;

use chatlink_domain::{Anchor, LinkifyConfig, LocationAnchor, Part};
use regex::Regex;
use tracing::debug;

use crate::annotation::{
    LineAnnotation, parse_preceding_line_number_annotation,
    parse_trailing_line_number_annotation_within,
};

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?](?:\s|$)").unwrap());

/// An unresolved anchor held back until the text around it has been seen.
#[derive(Debug)]
struct DelayedAnchor {
    anchor: LocationAnchor,
    /// Result of the preceding-text check. The snapshot it ran against never
    /// changes, so it is computed once when the anchor is buffered.
    preceding: Option<LineAnnotation>,
    trailing: String,
    trailing_chars: usize,
}

impl DelayedAnchor {
    fn should_release(&self, config: &LinkifyConfig) -> bool {
        self.preceding.is_some()
            || self.trailing.contains('\n')
            || SENTENCE_END.is_match(&self.trailing)
            || self.trailing_chars > config.trailing_flush_chars
            || self.trailing_annotation(config).is_some()
    }

    fn trailing_annotation(&self, config: &LinkifyConfig) -> Option<LineAnnotation> {
        parse_trailing_line_number_annotation_within(&self.trailing, config.trailing_window)
    }
}

/// Delays bare file anchors so that a line number mentioned before or after
/// them can still be attached.
///
/// Parts go in through [`AnchorBuffer::push`] and come out, possibly later and
/// possibly upgraded, in the same relative order.
#[derive(Debug)]
pub(crate) struct AnchorBuffer {
    config: LinkifyConfig,
    delayed: Option<DelayedAnchor>,
    /// Contiguous text emitted since the last anchor, capped to the preceding
    /// window.
    recent_text: String,
}

impl AnchorBuffer {
    pub fn new(config: LinkifyConfig) -> Self {
        Self { config, delayed: None, recent_text: String::new() }
    }

    pub fn push(&mut self, part: Part, out: &mut Vec<Part>) {
        match part {
            Part::Anchor(Anchor::Location(anchor)) if !anchor.is_resolved() => {
                self.release(out);

                let preceding = parse_preceding_line_number_annotation(&self.recent_text);
                let anchor = match &preceding {
                    Some(annotation) => {
                        debug!(
                            uri = %anchor.uri,
                            line = annotation.start_line,
                            "Resolved anchor from preceding text"
                        );
                        anchor.resolved_at_line(annotation.start_line)
                    }
                    None => anchor,
                };

                self.delayed = Some(DelayedAnchor {
                    anchor,
                    preceding,
                    trailing: String::new(),
                    trailing_chars: 0,
                });
            }
            Part::Text(text) => match self.delayed.as_mut() {
                Some(delayed) => {
                    delayed.trailing_chars += text.chars().count();
                    delayed.trailing.push_str(&text);
                    if delayed.should_release(&self.config) {
                        self.release(out);
                    }
                }
                None => self.emit(Part::Text(text), out),
            },
            part => {
                self.release(out);
                self.emit(part, out);
            }
        }
    }

    /// Emits the buffered anchor, if any, followed by its trailing text.
    pub fn release(&mut self, out: &mut Vec<Part>) {
        let Some(delayed) = self.delayed.take() else {
            return;
        };

        let anchor = match delayed.trailing_annotation(&self.config) {
            Some(annotation) if !delayed.anchor.is_resolved() => {
                debug!(
                    uri = %delayed.anchor.uri,
                    line = annotation.start_line,
                    "Resolved anchor from trailing text"
                );
                delayed.anchor.resolved_at_line(annotation.start_line)
            }
            _ => delayed.anchor,
        };

        self.emit(Part::from(anchor), out);
        if !delayed.trailing.is_empty() {
            self.emit(Part::Text(delayed.trailing), out);
        }
    }

    pub fn is_holding(&self) -> bool {
        self.delayed.is_some()
    }

    fn emit(&mut self, part: Part, out: &mut Vec<Part>) {
        match &part {
            Part::Text(text) => {
                self.recent_text.push_str(text);
                keep_last_chars(&mut self.recent_text, self.config.preceding_window);
            }
            Part::Anchor(_) => self.recent_text.clear(),
        }
        out.push(part);
    }
}

fn keep_last_chars(text: &mut String, max_chars: usize) {
    let count = text.chars().count();
    if count <= max_chars {
        return;
    }
    if let Some((index, _)) = text.char_indices().nth(count - max_chars) {
        text.drain(..index);
    }
}
