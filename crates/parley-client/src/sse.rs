// ABOUTME: Incremental decoder for the agent's server-push event stream
// ABOUTME: Reassembles event/data blocks across arbitrary chunk boundaries

/// Event type assigned to a block that carries no `event:` line.
pub const DEFAULT_EVENT: &str = "message";

/// One decoded block from the stream: an event tag plus its raw JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

/// Re-entrant parser for the chunked event stream.
///
/// Chunks arrive with no alignment guarantees: a single chunk may hold zero,
/// one, or many complete blocks, and may end in the middle of a line (or in
/// the middle of a UTF-8 sequence). The parser buffers the trailing partial
/// line between calls, so feeding the same bytes in any chunking yields the
/// same frames.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
    pending_event: Option<String>,
    pending_data: Option<String>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and collect every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let mut line = &raw[..raw.len() - 1];
            if line.ends_with(b"\r") {
                line = &line[..line.len() - 1];
            }
            let line = String::from_utf8_lossy(line).into_owned();
            self.process_line(&line, &mut frames);
        }
        frames
    }

    /// Whether a partial line is still buffered. A non-empty buffer at stream
    /// end is protocol-incomplete input and is simply discarded with the
    /// parser; this exists so callers can log that case.
    pub fn has_partial_input(&self) -> bool {
        !self.buffer.is_empty() || self.pending_data.is_some()
    }

    fn process_line(&mut self, line: &str, frames: &mut Vec<Frame>) {
        if line.is_empty() {
            // Block terminator. Emits only when a payload is pending.
            if let Some(data) = self.pending_data.take() {
                frames.push(Frame {
                    event: self
                        .pending_event
                        .take()
                        .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
                    data,
                });
            }
            self.pending_event = None;
            return;
        }

        if let Some(rest) = line.strip_prefix("event:") {
            self.pending_event = Some(strip_leading_space(rest).to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            // Last data line before the terminator wins; earlier ones are
            // replaced, not concatenated.
            self.pending_data = Some(strip_leading_space(rest).to_string());
        } else if line.starts_with(':') {
            // Heartbeat comment, no frame.
        } else {
            tracing::debug!(line = %line, "ignoring unrecognized stream line");
        }
    }
}

fn strip_leading_space(value: &str) -> &str {
    value.strip_prefix(' ').unwrap_or(value)
}
