use std::collections::VecDeque;
use std::sync::Arc;

use chatlink_domain::{
    ContributedLinkifier, Error, LinkifyConfig, LinkifyContext, Part, Result, coalesce_parts,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::buffer::AnchorBuffer;
use crate::pipeline::LinkifierPipeline;
use crate::state::{Action, State, last_line, split_runs};

/// Incrementally turns one streamed chat response into text and anchors.
///
/// A new instance is created for every response. Chunks are fed through
/// [`ResponseLinkifier::append`] as they arrive and [`ResponseLinkifier::flush`]
/// is called once when the stream ends.
pub struct ResponseLinkifier {
    state: State,
    pipeline: LinkifierPipeline,
    context: LinkifyContext,
    buffer: AnchorBuffer,
    /// Source text processed since the last newline.
    current_line: String,
    flushed: bool,
}

impl ResponseLinkifier {
    pub fn new(
        linkifiers: Vec<Arc<dyn ContributedLinkifier>>,
        context: LinkifyContext,
        scheme: impl Into<String>,
    ) -> Self {
        Self::with_config(linkifiers, context, LinkifyConfig::default().scheme(scheme))
    }

    pub fn with_config(
        linkifiers: Vec<Arc<dyn ContributedLinkifier>>,
        context: LinkifyContext,
        config: LinkifyConfig,
    ) -> Self {
        Self {
            state: State::default(),
            pipeline: LinkifierPipeline::new(linkifiers, config.scheme.clone()),
            context,
            buffer: AnchorBuffer::new(config),
            current_line: String::new(),
            flushed: false,
        }
    }

    /// Processes the next chunk of the response and returns whatever can be
    /// emitted safely. Partial tokens and delayed anchors are held back.
    pub async fn append(&mut self, chunk: &str, cancel: &CancellationToken) -> Result<Vec<Part>> {
        self.ensure_open()?;

        let mut out = Vec::new();
        let mut queue: VecDeque<String> = split_runs(chunk).map(str::to_string).collect();

        while let Some(run) = queue.pop_front() {
            let transition = std::mem::take(&mut self.state).advance(&run, &self.current_line);
            self.state = transition.state;
            self.apply(transition.actions, &mut queue, &mut out, cancel).await?;
        }

        let transition = std::mem::take(&mut self.state).end_of_chunk(&self.current_line);
        self.state = transition.state;
        self.apply(transition.actions, &mut queue, &mut out, cancel).await?;

        let out = coalesce_parts(out);
        debug!(
            chunk_len = chunk.len(),
            parts = out.len(),
            holding_anchor = self.buffer.is_holding(),
            "Appended chunk"
        );
        Ok(out)
    }

    /// Releases everything still held back. Must be called exactly once, after
    /// the last [`ResponseLinkifier::append`].
    pub async fn flush(&mut self, cancel: &CancellationToken) -> Result<Option<Vec<Part>>> {
        self.ensure_open()?;
        self.flushed = true;

        let mut out = Vec::new();
        self.buffer.release(&mut out);

        let actions = std::mem::take(&mut self.state).drain();
        self.apply(actions, &mut VecDeque::new(), &mut out, cancel).await?;

        // Draining may have produced a new bare anchor.
        self.buffer.release(&mut out);

        let out = coalesce_parts(out);
        debug!(parts = out.len(), "Flushed response linkifier");
        Ok((!out.is_empty()).then_some(out))
    }

    fn ensure_open(&self) -> Result<()> {
        debug_assert!(!self.flushed, "ResponseLinkifier used after flush");
        if self.flushed {
            return Err(Error::AlreadyFlushed);
        }
        Ok(())
    }

    async fn apply(
        &mut self,
        actions: Vec<Action>,
        queue: &mut VecDeque<String>,
        out: &mut Vec<Part>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for action in actions {
            match action {
                Action::Emit(text) => {
                    self.record(&text);
                    self.buffer.push(Part::Text(text), out);
                }
                Action::Linkify { text, skip_delinkify } => {
                    let parts = self
                        .pipeline
                        .run(&text, &self.context, skip_delinkify, cancel)
                        .await?;
                    self.record(&text);
                    for part in parts {
                        self.buffer.push(part, out);
                    }
                }
                Action::Reprocess(text) => {
                    let runs: Vec<&str> = split_runs(&text).collect();
                    for run in runs.into_iter().rev() {
                        queue.push_front(run.to_string());
                    }
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, text: &str) {
        if text.contains('\n') {
            self.current_line = last_line(text).to_string();
        } else {
            self.current_line.push_str(text);
        }
    }
}
