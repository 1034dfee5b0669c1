//! Incremental `text/event-stream` framing.
//!
//! Frames are separated by a blank line. Each frame's `data:` lines are
//! unwrapped into a single payload; comments and the `event`/`id`/`retry`
//! fields carry nothing the decoder needs and are dropped.
use bytes::{Buf, BytesMut};

const DELIMITER: &[u8] = b"\n\n";
const IGNORED_FIELDS: [&str; 3] = ["event:", "id:", "retry:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("frame exceeds {max_bytes} bytes without a delimiter")]
pub struct FrameOverflow {
    pub max_bytes: usize,
}

/// Splits a chunked byte stream into frame payloads.
#[derive(Debug)]
pub struct FrameSplitter {
    buffer: BytesMut,
    scanned: usize,
    max_frame_bytes: usize,
}

impl FrameSplitter {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            max_frame_bytes,
        }
    }

    /// Feeds one chunk and returns every payload it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, FrameOverflow> {
        self.buffer
            .extend(chunk.iter().copied().filter(|byte| *byte != b'\r'));

        let mut payloads = Vec::new();
        while let Some(pos) = self.find_delimiter() {
            let frame = self.buffer.split_to(pos);
            self.buffer.advance(DELIMITER.len());
            self.scanned = 0;
            if let Some(payload) = frame_payload(&String::from_utf8_lossy(&frame)) {
                payloads.push(payload);
            }
        }
        self.scanned = self.buffer.len().saturating_sub(DELIMITER.len() - 1);

        if self.buffer.len() > self.max_frame_bytes {
            return Err(FrameOverflow {
                max_bytes: self.max_frame_bytes,
            });
        }
        Ok(payloads)
    }

    /// Flushes an unterminated trailing frame at a clean end of stream.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.buffer.split();
        self.scanned = 0;
        frame_payload(&String::from_utf8_lossy(&rest))
    }

    /// Drops any partially received frame.
    pub fn discard(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn find_delimiter(&self) -> Option<usize> {
        self.buffer[self.scanned..]
            .windows(DELIMITER.len())
            .position(|window| window == DELIMITER)
            .map(|pos| pos + self.scanned)
    }
}

/// Unwraps the payload of a single frame; `None` when nothing is left.
pub fn frame_payload(frame: &str) -> Option<String> {
    let lines: Vec<&str> = frame
        .split('\n')
        .filter(|line| !line.starts_with(':'))
        .filter(|line| !IGNORED_FIELDS.iter().any(|field| line.starts_with(field)))
        .map(|line| match line.strip_prefix("data:") {
            Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
            None => line,
        })
        .collect();
    let payload = lines.join("\n");
    let payload = payload.trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}
