use crate::{MessageCategory, ProcessingMessage, ProcessingStage};

/// Overall percentage is held below this until completion is observed.
pub const PROGRESS_CAP: u8 = 99;

/// Weight (percent of the whole run) and base offset of a stage.
fn stage_band(stage: ProcessingStage) -> Option<(u32, u32)> {
    match stage {
        ProcessingStage::Extraction => Some((20, 0)),
        ProcessingStage::ImageProcessing => Some((30, 20)),
        ProcessingStage::Analysis => Some((20, 50)),
        ProcessingStage::Summarization => Some((30, 70)),
        ProcessingStage::Completion => None,
    }
}

/// Overall threshold at which a stage is shown as done.
fn done_threshold(stage: ProcessingStage) -> Option<u8> {
    match stage {
        ProcessingStage::Extraction => Some(20),
        ProcessingStage::ImageProcessing => Some(50),
        ProcessingStage::Analysis => Some(70),
        ProcessingStage::Summarization => Some(99),
        ProcessingStage::Completion => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Active,
    Done,
}

/// Running overall-progress estimate for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressEstimator {
    overall: u8,
    current_stage: Option<ProcessingStage>,
    eta_seconds: Option<u64>,
}

impl ProgressEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overall(&self) -> u8 {
        self.overall
    }

    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage
    }

    pub fn eta_seconds(&self) -> Option<u64> {
        self.eta_seconds
    }

    /// Folds one message into the estimate. `elapsed_ms` is the client time
    /// since the run started.
    pub fn apply(&mut self, message: &ProcessingMessage, elapsed_ms: u64) {
        if let Some(stage) = message.stage {
            self.current_stage = Some(stage);
        }

        if message.category == MessageCategory::Completion
            || message.stage == Some(ProcessingStage::Completion)
        {
            self.force_complete();
            return;
        }

        let (Some(stage), Some(progress)) = (message.stage, message.progress) else {
            return;
        };
        let Some(estimate) = stage_estimate(stage, progress) else {
            return;
        };
        self.overall = self.overall.max(estimate);
        self.recompute_eta(elapsed_ms);
    }

    pub fn force_complete(&mut self) {
        self.overall = 100;
        self.eta_seconds = Some(0);
    }

    pub fn stage_status(&self, stage: ProcessingStage, run_completed: bool) -> StageStatus {
        let done = match done_threshold(stage) {
            Some(threshold) => self.overall >= threshold,
            None => run_completed,
        };
        if done {
            StageStatus::Done
        } else if self.current_stage == Some(stage) {
            StageStatus::Active
        } else {
            StageStatus::Pending
        }
    }

    fn recompute_eta(&mut self, elapsed_ms: u64) {
        if self.overall == 0 {
            return;
        }
        let elapsed = elapsed_ms as f64 / 1000.0;
        let remaining = elapsed * (100.0 / f64::from(self.overall) - 1.0);
        self.eta_seconds = Some(remaining.max(0.0).round() as u64);
    }
}

/// `base + weight * progress`, rounded half-up and capped below 100.
pub fn stage_estimate(stage: ProcessingStage, progress: u8) -> Option<u8> {
    let (weight, base) = stage_band(stage)?;
    let progress = u32::from(progress.min(100));
    // Scaled by 100 to keep the rounding exact.
    let scaled = base * 100 + weight * progress;
    let rounded = (scaled + 50) / 100;
    Some(rounded.min(u32::from(PROGRESS_CAP)) as u8)
}
