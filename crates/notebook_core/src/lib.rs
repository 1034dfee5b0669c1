//! Notebook core: pure processing-run state machine and view-model helpers.
mod classify;
mod effect;
mod message;
mod msg;
mod progress;
mod source;
mod state;
mod thinking;
mod update;
mod view_model;

pub use classify::{decode_event, infer_progress, infer_stage, map_category};
pub use effect::Effect;
pub use message::{IncomingEvent, MessageCategory, ProcessingMessage, ProcessingStage};
pub use msg::Msg;
pub use progress::{stage_estimate, ProgressEstimator, StageStatus, PROGRESS_CAP};
pub use source::{SourceError, SourcePayload};
pub use state::{RunId, RunOutcome, RunPhase, RunState, CANCELLED_BY_USER};
pub use thinking::split_thinking;
pub use update::update;
pub use view_model::{RunSummary, StageIndicator, TimelineRow, TimelineView};
