//! Notebook engine: processing-stream IO and event decoding.
mod client;
mod engine;
mod sse;
mod types;
mod wire;

pub use client::{ChannelProgressSink, ProcessingSettings, Processor, ProgressSink, ReqwestProcessor};
pub use engine::EngineHandle;
pub use sse::{frame_payload, FrameOverflow, FrameSplitter};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    EngineEvent, FailureKind, RunId, StreamError, StreamReport, UploadPayload,
};
pub use wire::{decode_frame, WireError, WireEvent};
