use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;

use crate::constants::stream::{DATA_PREFIX, FRAME_DELIMITER};
use crate::stream::event::StreamEvent;

pub type EventStream = BoxStream<'static, StreamEvent>;

/// Incremental decoder for `data: <json>\n\n` frames.
///
/// Bytes are buffered until a full frame arrives, so frames (and UTF-8
/// sequences) may be split across chunks arbitrarily. A frame that fails to
/// parse is logged and dropped; decoding continues with the next one.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Offset below which the buffer holds no delimiter.
    scanned: usize,
    malformed: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every event completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.next_delimiter() {
            let frame: Vec<u8> = self.buffer.drain(..end + FRAME_DELIMITER.len()).collect();
            self.scanned = 0;
            if let Some(event) = self.parse_frame(&frame[..end]) {
                events.push(event);
            }
        }
        events
    }

    /// Parse whatever is left once the transport has closed.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        self.parse_frame(&rest)
    }

    /// Frames dropped because their payload was not a valid event.
    pub fn malformed_frames(&self) -> usize {
        self.malformed
    }

    /// Bytes received but not yet terminated by a frame delimiter.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Search only the bytes not already scanned. A delimiter may straddle
    /// the previous end of the buffer, so the last partial match is rescanned.
    fn next_delimiter(&mut self) -> Option<usize> {
        let found = find_delimiter(&self.buffer[self.scanned..]).map(|at| at + self.scanned);
        if found.is_none() {
            self.scanned = self
                .buffer
                .len()
                .saturating_sub(FRAME_DELIMITER.len() - 1);
        }
        found
    }

    fn parse_frame(&mut self, frame: &[u8]) -> Option<StreamEvent> {
        let text = String::from_utf8_lossy(frame);
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let Some(payload) = text.strip_prefix(DATA_PREFIX) else {
            tracing::trace!(frame = %text, "Ignoring non-data SSE frame");
            return None;
        };
        if payload.trim() == "[DONE]" {
            return None;
        }

        match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                self.malformed += 1;
                tracing::warn!(error = %e, "Skipping malformed stream frame");
                None
            }
        }
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_DELIMITER.len())
        .position(|window| window == FRAME_DELIMITER)
}

struct DecodeState<S> {
    source: Option<S>,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
}

impl<S> DecodeState<S> {
    /// Drop the transport. Dropping the reader cancels the underlying read.
    fn release(&mut self) {
        self.source = None;
    }
}

/// Turn a chunked byte stream into a lazy, single-pass event stream.
///
/// The stream ends after the first terminal event, when the source ends, or
/// when the source yields an error (reported as a terminal `Disconnected`
/// event, distinct from an `error` sent by the model).
/// The source is dropped as soon as it is no longer needed, and dropping the
/// returned stream early drops it too.
pub fn decode_events<S, B, E>(source: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Unpin + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        source: Some(source),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                if event.is_terminal() {
                    state.pending.clear();
                    state.release();
                }
                return Some((event, state));
            }

            let source = state.source.as_mut()?;
            match source.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Stream transport failed");
                    state.release();
                    return Some((StreamEvent::disconnected(e.to_string()), state));
                }
                None => {
                    state.release();
                    let last = state.decoder.finish()?;
                    state.pending.push_back(last);
                }
            }
        }
    })
    .boxed()
}
