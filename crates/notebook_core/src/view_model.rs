use crate::{MessageCategory, ProcessingStage, RunPhase, StageStatus};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimelineView {
    pub phase: RunPhase,
    pub document_name: Option<String>,
    pub document_type: Option<String>,
    pub rows: Vec<TimelineRow>,
    pub overall_progress: u8,
    pub current_stage: Option<ProcessingStage>,
    /// Only reported while a run is active.
    pub eta_seconds: Option<u64>,
    pub stages: Vec<StageIndicator>,
    /// Persistent error banner after a transport failure.
    pub error_banner: Option<String>,
    pub summary: Option<RunSummary>,
    pub can_cancel: bool,
    pub skipped_frames: u32,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRow {
    pub index: usize,
    pub category: MessageCategory,
    /// First row of a run of rows with the same category.
    pub show_category_header: bool,
    pub stage: Option<ProcessingStage>,
    pub show_stage_header: bool,
    pub content: String,
    pub reasoning: Option<String>,
    pub reasoning_expanded: bool,
    pub elapsed_seconds: u64,
    pub progress: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageIndicator {
    pub stage: ProcessingStage,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total_seconds: u64,
    pub document_name: String,
    pub message_count: usize,
}
