use std::fmt;

/// Display category of one timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCategory {
    Status,
    Progress,
    ImageAnalysis,
    Summary,
    Error,
    Completion,
}

impl MessageCategory {
    pub fn label(self) -> &'static str {
        match self {
            MessageCategory::Status => "Status Update",
            MessageCategory::Progress => "Processing",
            MessageCategory::ImageAnalysis => "Image Analysis",
            MessageCategory::Summary => "Document Summary",
            MessageCategory::Error => "Error",
            MessageCategory::Completion => "Process Complete",
        }
    }
}

/// Backend processing phase, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessingStage {
    Extraction,
    ImageProcessing,
    Analysis,
    Summarization,
    Completion,
}

impl ProcessingStage {
    pub const ALL: [ProcessingStage; 5] = [
        ProcessingStage::Extraction,
        ProcessingStage::ImageProcessing,
        ProcessingStage::Analysis,
        ProcessingStage::Summarization,
        ProcessingStage::Completion,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProcessingStage::Extraction => "Text Extraction",
            ProcessingStage::ImageProcessing => "Image Processing",
            ProcessingStage::Analysis => "Content Analysis",
            ProcessingStage::Summarization => "Summarization",
            ProcessingStage::Completion => "Completion",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One validated event as delivered by the engine, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncomingEvent {
    /// Wire `type` field, if the backend sent one.
    pub kind: Option<String>,
    pub content: String,
    pub elapsed_seconds: u64,
    /// Explicit stage-local percentage.
    pub progress: Option<u8>,
}

/// One normalized entry of the processing timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingMessage {
    pub category: MessageCategory,
    /// Displayed text, with any thinking block removed.
    pub content: String,
    /// Inner text of the thinking block, if the content carried one.
    pub reasoning: Option<String>,
    pub elapsed_seconds: u64,
    pub stage: Option<ProcessingStage>,
    pub progress: Option<u8>,
    /// Client receipt time in milliseconds since the run started.
    pub timestamp_ms: u64,
}

impl ProcessingMessage {
    /// Message produced locally (not decoded from the wire).
    pub fn local(
        category: MessageCategory,
        content: impl Into<String>,
        stage: Option<ProcessingStage>,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            category,
            content: content.into(),
            reasoning: None,
            elapsed_seconds: (timestamp_ms + 500) / 1000,
            stage,
            progress: None,
            timestamp_ms,
        }
    }
}
