use crate::{RunId, SourcePayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the processing stream for `source`.
    StartRun { run_id: RunId, source: SourcePayload },
    /// Abort the transfer of `run_id`.
    CancelRun { run_id: RunId },
    NotifyCompleted { run_id: RunId },
    NotifyFailed { run_id: RunId, error: String },
}
