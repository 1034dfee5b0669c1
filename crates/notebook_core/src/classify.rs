//! Classification of incoming events into the timeline taxonomy.
use crate::thinking::split_thinking;
use crate::{IncomingEvent, MessageCategory, ProcessingMessage, ProcessingStage};

const FINAL_SUMMARY: &str = "final_summary";

/// Stage keywords in priority order; the first hit wins.
const STAGE_KEYWORDS: &[(&[&str], ProcessingStage)] = &[
    (&["extract"], ProcessingStage::Extraction),
    (
        &["image analysis", "processing images"],
        ProcessingStage::ImageProcessing,
    ),
    (&["analysis"], ProcessingStage::Analysis),
    (&["summary", "summarization"], ProcessingStage::Summarization),
    (&["complete", "finished"], ProcessingStage::Completion),
];

/// Maps the wire `type` field to a category. Unknown or missing types are status updates.
pub fn map_category(kind: Option<&str>) -> MessageCategory {
    match kind {
        Some("status") => MessageCategory::Status,
        Some("progress") => MessageCategory::Progress,
        Some("image_analysis") => MessageCategory::ImageAnalysis,
        Some("summary") | Some(FINAL_SUMMARY) => MessageCategory::Summary,
        Some("error") => MessageCategory::Error,
        Some("completion") => MessageCategory::Completion,
        _ => MessageCategory::Status,
    }
}

pub fn infer_stage(kind: Option<&str>, content: &str) -> Option<ProcessingStage> {
    if kind == Some(FINAL_SUMMARY) {
        return Some(ProcessingStage::Summarization);
    }
    let lowered = content.to_lowercase();
    STAGE_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| lowered.contains(kw)))
        .map(|(_, stage)| *stage)
}

/// Explicit progress wins; otherwise the first `<digits>%` in the content
/// that lies within 0..=100. Larger figures ("250% faster") are passed over.
pub fn infer_progress(explicit: Option<u8>, content: &str) -> Option<u8> {
    explicit.or_else(|| first_percentage(content))
}

fn first_percentage(content: &str) -> Option<u8> {
    let bytes = content.as_bytes();
    for (idx, _) in content.match_indices('%') {
        let start = bytes[..idx]
            .iter()
            .rposition(|b| !b.is_ascii_digit())
            .map_or(0, |pos| pos + 1);
        if start == idx {
            continue;
        }
        match content[start..idx].parse::<u64>() {
            Ok(value) if value <= 100 => return Some(value as u8),
            _ => continue,
        }
    }
    None
}

/// Turns a validated event into a timeline message received at `timestamp_ms`.
pub fn decode_event(event: IncomingEvent, timestamp_ms: u64) -> ProcessingMessage {
    let kind = event.kind.as_deref();
    let category = map_category(kind);
    let stage = infer_stage(kind, &event.content);
    let progress = infer_progress(event.progress, &event.content);
    let (content, reasoning) = split_thinking(&event.content);

    ProcessingMessage {
        category,
        content,
        reasoning,
        elapsed_seconds: event.elapsed_seconds,
        stage,
        progress,
        timestamp_ms,
    }
}
