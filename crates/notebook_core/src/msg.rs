use crate::{IncomingEvent, RunId, RunOutcome, SourcePayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted a source for processing.
    RunRequested { source: SourcePayload },
    /// Engine delivered one validated event. `received_ms` is client time since run start.
    EventReceived {
        run_id: RunId,
        event: IncomingEvent,
        received_ms: u64,
    },
    /// Engine dropped a frame it could not decode.
    FrameSkipped { run_id: RunId },
    /// Engine stream ended.
    RunFinished {
        run_id: RunId,
        outcome: RunOutcome,
        finished_ms: u64,
    },
    /// User clicked Cancel.
    CancelRequested { at_ms: u64 },
    /// User toggled the thinking section of a timeline row.
    ThinkingToggled { index: usize },
    /// Component is going away; abort and forget the current run.
    TornDown,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
