//! Streaming response handling for the generation API.
//!
//! The body is a sequence of `data: <json>` lines. Chunk boundaries fall anywhere: inside
//! a multi-byte character, inside a JSON payload, between `\r` and `\n`. The decoder keeps
//! undecoded bytes and the unterminated trailing line across chunks.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

use crate::error::GenerationClientError;
use crate::types::{Frame, DATA_PREFIX, DONE_SENTINEL, PLACEHOLDER_STATUS};

/// Outcome of parsing a single `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameParse {
    /// A well-formed frame
    Frame(Frame),
    /// Truncated or malformed JSON; dropped without aborting the stream
    Incomplete,
    /// An explicit error frame; aborts the stream
    Failed(String),
}

/// Parse one payload (the text after `data: `).
pub fn parse_payload(payload: &str) -> FrameParse {
    match serde_json::from_str::<Frame>(payload) {
        Ok(Frame::Error { error }) => {
            let message = if error.trim().is_empty() {
                "Generation failed".to_string()
            } else {
                error
            };
            FrameParse::Failed(message)
        }
        Ok(frame) => FrameParse::Frame(frame),
        Err(e) => {
            tracing::debug!(
                "SSE: dropping unparseable payload: {} - data: {}",
                e,
                &payload[..floor_char_boundary(payload, 200)]
            );
            FrameParse::Incomplete
        }
    }
}

/// Incremental byte-to-frame decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending_bytes: Vec<u8>,
    /// Decoded text not yet terminated by a newline
    line_buffer: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the frames completed by it.
    ///
    /// Stops at the first error frame and returns it as `GenerationClientError::Stream`.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, GenerationClientError> {
        self.decode_utf8(chunk);
        let mut frames = Vec::new();

        while let Some(newline_pos) = self.line_buffer.find('\n') {
            let line: String = self.line_buffer.drain(..=newline_pos).collect();
            Self::handle_line(&line, &mut frames)?;
        }

        Ok(frames)
    }

    /// Flush whatever is left once the byte stream has ended.
    pub fn finish(&mut self) -> Result<Vec<Frame>, GenerationClientError> {
        if !self.pending_bytes.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending_bytes).into_owned();
            self.pending_bytes.clear();
            self.line_buffer.push_str(&rest);
        }

        let mut frames = Vec::new();
        let line = std::mem::take(&mut self.line_buffer);
        if !line.trim().is_empty() {
            tracing::debug!("SSE: flushing unterminated line of {} chars", line.len());
            Self::handle_line(&line, &mut frames)?;
        }
        Ok(frames)
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        self.pending_bytes.extend_from_slice(chunk);

        loop {
            match std::str::from_utf8(&self.pending_bytes) {
                Ok(text) => {
                    self.line_buffer.push_str(text);
                    self.pending_bytes.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.line_buffer
                        .push_str(&String::from_utf8_lossy(&self.pending_bytes[..valid]));
                    match e.error_len() {
                        // Sequence continues in the next chunk
                        None => {
                            self.pending_bytes.drain(..valid);
                            return;
                        }
                        Some(len) => {
                            tracing::warn!("SSE: replacing {} invalid UTF-8 byte(s)", len);
                            self.line_buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending_bytes.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    fn handle_line(line: &str, frames: &mut Vec<Frame>) -> Result<(), GenerationClientError> {
        let line = line.trim_end_matches(['\n', '\r']);

        // Only match the marker at the START of a line
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return Ok(());
        };
        let payload = payload.trim();

        if payload == DONE_SENTINEL {
            tracing::debug!("SSE: Received [DONE] marker");
            return Ok(());
        }

        match parse_payload(payload) {
            FrameParse::Frame(frame) => frames.push(frame),
            FrameParse::Incomplete => {}
            FrameParse::Failed(message) => {
                tracing::error!("SSE: error frame: {}", message);
                return Err(GenerationClientError::Stream(message));
            }
        }
        Ok(())
    }
}

/// A chunk from the streaming response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Text delta
    TextDelta {
        text: String,
        /// Accumulated text so far, including this delta
        accumulated: String,
    },
    /// Informative status from the backend
    Status { message: String },
    /// The accumulated text was discarded
    Cleared,
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GenerationClientError>> + Send>>;

/// A streaming response from the generation API.
pub struct StreamingResponse {
    /// The underlying byte stream
    inner: ByteStream,
    decoder: FrameDecoder,
    /// Frames decoded but not yet yielded
    queue: VecDeque<Frame>,
    /// Accumulated text content
    accumulated_text: String,
    /// Whether the byte stream has completed
    done: bool,
}

impl StreamingResponse {
    /// Create a new streaming response from a reqwest response.
    pub fn new(response: reqwest::Response) -> Self {
        tracing::debug!(
            "StreamingResponse::new - content-type: {:?}",
            response.headers().get("content-type")
        );
        let bytes = futures::StreamExt::map(response.bytes_stream(), |chunk| {
            chunk.map_err(|e| GenerationClientError::Transport(e.to_string()))
        });
        Self::from_byte_stream(bytes)
    }

    /// Create a streaming response from any byte stream.
    pub fn from_byte_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, GenerationClientError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
            decoder: FrameDecoder::new(),
            queue: VecDeque::new(),
            accumulated_text: String::new(),
            done: false,
        }
    }

    /// Create a streaming response from in-memory chunks.
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, GenerationClientError>> =
            chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::from_byte_stream(futures::stream::iter(chunks))
    }

    /// Get the accumulated text so far.
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    /// Consume the response, returning the accumulated text.
    pub fn into_text(self) -> String {
        self.accumulated_text
    }

    /// Apply a frame to the accumulation buffer.
    fn apply_frame(&mut self, frame: Frame) -> Option<StreamChunk> {
        match frame {
            Frame::ContentDelta { content } => {
                self.accumulated_text.push_str(&content);
                Some(StreamChunk::TextDelta {
                    text: content,
                    accumulated: self.accumulated_text.clone(),
                })
            }
            Frame::Status { message } => {
                if message.trim().is_empty() || message.trim() == PLACEHOLDER_STATUS {
                    None
                } else {
                    Some(StreamChunk::Status { message })
                }
            }
            Frame::Clear => {
                tracing::debug!(
                    "apply_frame: clear, discarding {} chars",
                    self.accumulated_text.len()
                );
                self.accumulated_text.clear();
                Some(StreamChunk::Cleared)
            }
            Frame::Unknown => {
                tracing::trace!("apply_frame: unknown frame type (skipped)");
                None
            }
            // The decoder turns error frames into errors before they get here
            Frame::Error { error } => {
                tracing::warn!("apply_frame: unexpected error frame: {}", error);
                None
            }
        }
    }
}

impl Stream for StreamingResponse {
    type Item = Result<StreamChunk, GenerationClientError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(frame) = self.queue.pop_front() {
                if let Some(chunk) = self.apply_frame(frame) {
                    return Poll::Ready(Some(Ok(chunk)));
                }
                continue;
            }

            if self.done {
                return Poll::Ready(None);
            }

            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    tracing::trace!("poll_next: received {} bytes", bytes.len());
                    match self.decoder.push(&bytes) {
                        Ok(frames) => self.queue.extend(frames),
                        Err(e) => {
                            self.done = true;
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::error!("poll_next: stream error: {}", e);
                    self.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    tracing::debug!(
                        "poll_next: stream ended, {} chars accumulated",
                        self.accumulated_text.len()
                    );
                    self.done = true;
                    match self.decoder.finish() {
                        Ok(frames) => self.queue.extend(frames),
                        Err(e) => return Poll::Ready(Some(Err(e))),
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Largest index `<= max` that lies on a char boundary of `s`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
