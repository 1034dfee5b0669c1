use std::fmt;

use crate::wire::WireEvent;

pub type RunId = u64;

/// Source bytes as they go out in the multipart body.
#[derive(Clone, PartialEq, Eq)]
pub enum UploadPayload {
    /// Sent as the `file` part.
    File { file_name: String, bytes: Vec<u8> },
    /// Sent as the `url` text field.
    Url(String),
    /// Sent as the `text` text field.
    Text(String),
}

impl UploadPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            UploadPayload::File { .. } => "file",
            UploadPayload::Url(_) => "url",
            UploadPayload::Text(_) => "text",
        }
    }
}

impl fmt::Debug for UploadPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadPayload::File { file_name, bytes } => f
                .debug_struct("File")
                .field("file_name", file_name)
                .field("len", &bytes.len())
                .finish(),
            UploadPayload::Url(url) => f.debug_tuple("Url").field(url).finish(),
            UploadPayload::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// One frame decoded into a valid record.
    Event { run_id: RunId, event: WireEvent },
    /// One frame failed validation and was dropped.
    FrameSkipped { run_id: RunId, reason: String },
    /// Stream ended; no further events follow for this run.
    RunFinished {
        run_id: RunId,
        result: Result<StreamReport, StreamError>,
    },
}

impl EngineEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            Self::Event { run_id, .. }
            | Self::FrameSkipped { run_id, .. }
            | Self::RunFinished { run_id, .. } => *run_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamReport {
    pub frames_decoded: u64,
    pub frames_skipped: u64,
    pub bytes_received: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StreamError {
    pub kind: FailureKind,
    pub message: String,
}

impl StreamError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "cancelled by user")
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidEndpoint,
    InvalidPayload,
    HttpStatus(u16),
    Timeout,
    FrameTooLarge { max_bytes: usize },
    Cancelled,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidEndpoint => write!(f, "invalid endpoint"),
            FailureKind::InvalidPayload => write!(f, "invalid payload"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::FrameTooLarge { max_bytes } => {
                write!(f, "frame larger than {max_bytes} bytes")
            }
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
