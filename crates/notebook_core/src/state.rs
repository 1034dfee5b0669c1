use std::collections::BTreeSet;

use crate::classify::decode_event;
use crate::progress::ProgressEstimator;
use crate::view_model::{RunSummary, StageIndicator, TimelineRow, TimelineView};
use crate::{IncomingEvent, MessageCategory, ProcessingMessage, ProcessingStage, SourcePayload};

pub type RunId = u64;

pub const CANCELLED_BY_USER: &str = "Processing cancelled by user.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// How the engine reports the end of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    phase: RunPhase,
    last_run_id: RunId,
    active_run: Option<RunId>,
    document_name: Option<String>,
    document_type: Option<String>,
    messages: Vec<ProcessingMessage>,
    expanded: BTreeSet<usize>,
    estimator: ProgressEstimator,
    error: Option<String>,
    skipped_frames: u32,
    last_timestamp_ms: u64,
    finished_ms: Option<u64>,
    dirty: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Run whose events are currently accepted.
    pub fn active_run(&self) -> Option<RunId> {
        self.active_run
    }

    pub fn messages(&self) -> &[ProcessingMessage] {
        &self.messages
    }

    pub fn overall_progress(&self) -> u8 {
        self.estimator.overall()
    }

    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.estimator.current_stage()
    }

    pub fn view(&self) -> TimelineView {
        let completed = self.phase == RunPhase::Completed;
        let running = self.phase == RunPhase::Running;

        let rows = self
            .messages
            .iter()
            .enumerate()
            .map(|(index, message)| {
                let previous = index.checked_sub(1).map(|prev| &self.messages[prev]);
                TimelineRow {
                    index,
                    category: message.category,
                    show_category_header: previous
                        .map_or(true, |prev| prev.category != message.category),
                    stage: message.stage,
                    show_stage_header: message.stage.is_some()
                        && previous.map_or(true, |prev| prev.stage != message.stage),
                    content: message.content.clone(),
                    reasoning: message.reasoning.clone(),
                    reasoning_expanded: self.expanded.contains(&index),
                    elapsed_seconds: message.elapsed_seconds,
                    progress: message.progress,
                }
            })
            .collect();

        let stages = ProcessingStage::ALL
            .iter()
            .map(|&stage| StageIndicator {
                stage,
                status: self.estimator.stage_status(stage, completed),
            })
            .collect();

        let summary = match (completed, self.finished_ms) {
            (true, Some(finished_ms)) => Some(RunSummary {
                total_seconds: (finished_ms + 500) / 1000,
                document_name: self.document_name.clone().unwrap_or_default(),
                message_count: self.messages.len(),
            }),
            _ => None,
        };

        TimelineView {
            phase: self.phase,
            document_name: self.document_name.clone(),
            document_type: self.document_type.clone(),
            rows,
            overall_progress: self.estimator.overall(),
            current_stage: self.estimator.current_stage(),
            eta_seconds: if running {
                self.estimator.eta_seconds()
            } else {
                None
            },
            stages,
            error_banner: if running { None } else { self.error.clone() },
            summary,
            can_cancel: running,
            skipped_frames: self.skipped_frames,
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub(crate) fn accepts(&self, run_id: RunId) -> bool {
        self.active_run == Some(run_id)
    }

    /// Clears all per-run data and makes a fresh run active.
    pub(crate) fn start_run(&mut self, source: &SourcePayload) -> RunId {
        self.last_run_id += 1;
        let run_id = self.last_run_id;
        self.clear_run();
        self.phase = RunPhase::Running;
        self.active_run = Some(run_id);
        self.document_name = Some(source.document_name());
        self.document_type = Some(source.document_type());
        self.dirty = true;
        run_id
    }

    pub(crate) fn apply_event(&mut self, event: IncomingEvent, received_ms: u64) {
        let timestamp_ms = self.clamp_timestamp(received_ms);
        let message = decode_event(event, timestamp_ms);
        self.estimator.apply(&message, timestamp_ms);
        self.push_message(message);
    }

    pub(crate) fn record_skipped_frame(&mut self) {
        self.skipped_frames += 1;
        self.dirty = true;
    }

    pub(crate) fn complete(&mut self, finished_ms: u64) {
        let timestamp_ms = self.clamp_timestamp(finished_ms);
        let document_type = self
            .document_type
            .clone()
            .unwrap_or_else(|| "Document".to_string());
        self.estimator.force_complete();
        self.push_message(ProcessingMessage::local(
            MessageCategory::Completion,
            format!("{document_type} processing completed successfully."),
            Some(ProcessingStage::Completion),
            timestamp_ms,
        ));
        self.finish(RunPhase::Completed, timestamp_ms);
    }

    pub(crate) fn fail(&mut self, reason: String, finished_ms: u64) {
        let timestamp_ms = self.clamp_timestamp(finished_ms);
        self.push_message(ProcessingMessage::local(
            MessageCategory::Error,
            reason.clone(),
            None,
            timestamp_ms,
        ));
        self.error = Some(reason);
        self.finish(RunPhase::Failed, timestamp_ms);
    }

    pub(crate) fn mark_cancelled(&mut self, finished_ms: u64) {
        let timestamp_ms = self.clamp_timestamp(finished_ms);
        self.finish(RunPhase::Cancelled, timestamp_ms);
    }

    pub(crate) fn cancel_by_user(&mut self, at_ms: u64) {
        let timestamp_ms = self.clamp_timestamp(at_ms);
        self.push_message(ProcessingMessage::local(
            MessageCategory::Status,
            CANCELLED_BY_USER,
            None,
            timestamp_ms,
        ));
        self.finish(RunPhase::Cancelled, timestamp_ms);
    }

    pub(crate) fn toggle_thinking(&mut self, index: usize) {
        let has_reasoning = self
            .messages
            .get(index)
            .is_some_and(|message| message.reasoning.is_some());
        if !has_reasoning {
            return;
        }
        if !self.expanded.remove(&index) {
            self.expanded.insert(index);
        }
        self.dirty = true;
    }

    /// Forgets the current run entirely; run ids keep counting.
    pub(crate) fn reset(&mut self) {
        let last_run_id = self.last_run_id;
        *self = Self {
            last_run_id,
            dirty: true,
            ..Self::default()
        };
    }

    fn clear_run(&mut self) {
        self.messages.clear();
        self.expanded.clear();
        self.estimator = ProgressEstimator::new();
        self.error = None;
        self.skipped_frames = 0;
        self.last_timestamp_ms = 0;
        self.finished_ms = None;
    }

    fn finish(&mut self, phase: RunPhase, timestamp_ms: u64) {
        self.phase = phase;
        self.active_run = None;
        self.finished_ms = Some(timestamp_ms);
        self.dirty = true;
    }

    fn clamp_timestamp(&mut self, received_ms: u64) -> u64 {
        self.last_timestamp_ms = self.last_timestamp_ms.max(received_ms);
        self.last_timestamp_ms
    }

    /// Progress updates for the same stage replace the previous entry in place.
    fn push_message(&mut self, message: ProcessingMessage) {
        let collapses = message.category == MessageCategory::Progress
            && self.messages.last().is_some_and(|last| {
                last.category == MessageCategory::Progress && last.stage == message.stage
            });
        if collapses {
            let index = self.messages.len() - 1;
            self.expanded.remove(&index);
            self.messages[index] = message;
        } else {
            self.messages.push(message);
        }
        self.dirty = true;
    }
}
