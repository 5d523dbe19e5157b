use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::{LoomError, Result};
use crate::project::FileOperation;
use crate::stream::event::StreamEvent;

/// The materialized result of one generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledResponse {
    pub thought: String,
    pub message: String,
    pub files: Vec<FileOperation>,
}

/// Running counters for incremental text, for progress reporting only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamProgress {
    pub events: usize,
    pub thinking_chars: usize,
    pub token_chars: usize,
    /// Last output total reported by the server, if any.
    pub reported_total: Option<u64>,
}

type ProgressCallback = Box<dyn FnMut(&StreamProgress) + Send>;

/// Reduces a stream of events into a single [`AssembledResponse`].
///
/// `files` events replace the pending operations (latest wins). `done`
/// finalizes; `error` and a transport disconnect abort and discard
/// everything accumulated so far.
#[derive(Default)]
pub struct ResponseAssembler {
    thinking: String,
    pending_files: Vec<FileOperation>,
    progress: StreamProgress,
    on_progress: Option<ProgressCallback>,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke `callback` after every thinking or token event.
    pub fn with_progress(mut self, callback: impl FnMut(&StreamProgress) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn progress(&self) -> StreamProgress {
        self.progress
    }

    /// Feed one event. Returns `Ok(Some(_))` once the response is complete.
    pub fn apply(&mut self, event: StreamEvent) -> Result<Option<AssembledResponse>> {
        self.progress.events += 1;
        match event {
            StreamEvent::Thinking { text } => {
                if let Some(text) = text {
                    self.progress.thinking_chars += text.chars().count();
                    self.thinking.push_str(&text);
                }
                self.report_progress();
                Ok(None)
            }
            StreamEvent::Token { text, total } => {
                if let Some(text) = text {
                    self.progress.token_chars += text.chars().count();
                }
                if total.is_some() {
                    self.progress.reported_total = total;
                }
                self.report_progress();
                Ok(None)
            }
            StreamEvent::Files { files } => {
                tracing::debug!(count = files.len(), "Received pending file operations");
                self.pending_files = files;
                Ok(None)
            }
            StreamEvent::Done {
                thought,
                message,
                files,
            } => {
                let response = AssembledResponse {
                    thought: thought.unwrap_or_else(|| std::mem::take(&mut self.thinking)),
                    message: message.unwrap_or_default(),
                    files: files.unwrap_or_else(|| std::mem::take(&mut self.pending_files)),
                };
                tracing::debug!(
                    files = response.files.len(),
                    events = self.progress.events,
                    "Generation complete"
                );
                Ok(Some(response))
            }
            StreamEvent::Error { error } => {
                self.thinking.clear();
                self.pending_files.clear();
                let message = error.unwrap_or_else(|| "unknown error".to_string());
                tracing::warn!(error = %message, "Generation reported an error");
                Err(LoomError::Stream(message))
            }
            StreamEvent::Disconnected { reason } => {
                self.thinking.clear();
                self.pending_files.clear();
                tracing::warn!(error = %reason, "Generation stream disconnected");
                Err(LoomError::Transport(reason))
            }
        }
    }

    /// Consume `events` until a terminal event. Stops pulling (and drops the
    /// stream) as soon as the result is known.
    pub async fn assemble<S>(mut self, mut events: S) -> Result<AssembledResponse>
    where
        S: Stream<Item = StreamEvent> + Unpin,
    {
        while let Some(event) = events.next().await {
            if let Some(response) = self.apply(event)? {
                return Ok(response);
            }
        }
        Err(LoomError::IncompleteStream)
    }

    fn report_progress(&mut self) {
        tracing::trace!(
            thinking_chars = self.progress.thinking_chars,
            token_chars = self.progress.token_chars,
            "Stream progress"
        );
        if let Some(callback) = self.on_progress.as_mut() {
            callback(&self.progress);
        }
    }
}
