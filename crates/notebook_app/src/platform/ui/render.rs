use notebook_core::{
    ProcessingStage, RunPhase, StageIndicator, StageStatus, TimelineRow, TimelineView,
};

use super::constants::*;

/// Turns successive view models into terminal lines, printing only what changed.
pub struct TimelinePrinter {
    started_label: String,
    show_thinking: bool,
    header_done: bool,
    printed: Vec<TimelineRow>,
    last_progress: Option<(u8, Option<ProcessingStage>)>,
    footer_done: bool,
}

impl TimelinePrinter {
    pub fn new(started_label: impl Into<String>, show_thinking: bool) -> Self {
        Self {
            started_label: started_label.into(),
            show_thinking,
            header_done: false,
            printed: Vec::new(),
            last_progress: None,
            footer_done: false,
        }
    }

    pub fn render(&mut self, view: &TimelineView) -> Vec<String> {
        let mut lines = Vec::new();

        if !self.header_done {
            if let Some(name) = &view.document_name {
                lines.push(format!(
                    "Processing document: {} ({}) at {}",
                    name,
                    view.document_type.as_deref().unwrap_or("Document"),
                    self.started_label
                ));
                self.header_done = true;
            }
        }

        for row in &view.rows {
            match self.printed.get(row.index) {
                Some(previous) if previous == row => continue,
                Some(_) => lines.extend(self.render_row(row, true)),
                None => lines.extend(self.render_row(row, false)),
            }
        }
        self.printed = view.rows.clone();

        let progress = (view.overall_progress, view.current_stage);
        if view.phase == RunPhase::Running && self.last_progress != Some(progress) {
            lines.push(progress_line(view));
            self.last_progress = Some(progress);
        }

        if !self.footer_done && view.phase != RunPhase::Running && view.phase != RunPhase::Idle {
            lines.push(progress_line(view));
            lines.push(stage_line(&view.stages));
            if let Some(summary) = &view.summary {
                lines.push(format!(
                    "Processing Summary: total time {}s | document {} | status Complete | messages {}",
                    summary.total_seconds, summary.document_name, summary.message_count
                ));
            }
            if let Some(banner) = &view.error_banner {
                lines.push(format!("Error: {banner}"));
            }
            if view.skipped_frames > 0 {
                lines.push(format!("{} malformed frame(s) skipped", view.skipped_frames));
            }
            self.footer_done = true;
        }

        lines
    }

    fn render_row(&self, row: &TimelineRow, updated: bool) -> Vec<String> {
        let mut lines = Vec::new();
        if !updated {
            if row.show_category_header {
                lines.push(format!("== {} ==", row.category.label()));
            }
            if let (true, Some(stage)) = (row.show_stage_header, row.stage) {
                lines.push(format!("  -- {}", stage.label()));
            }
        }

        let marker = if updated { "~" } else { " " };
        let mut text = format!("{marker} [{:>3}s] {}", row.elapsed_seconds, row.content);
        if let Some(progress) = row.progress {
            text.push_str(&format!(" ({progress}%)"));
        }
        lines.push(text);

        if let Some(reasoning) = &row.reasoning {
            if self.show_thinking || row.reasoning_expanded {
                lines.push(format!("{INDENT}thinking:"));
                lines.extend(reasoning.lines().map(|line| format!("{INDENT}| {line}")));
            } else {
                lines.push(format!("{INDENT}(thinking hidden)"));
            }
        }
        lines
    }
}

pub fn progress_bar(percent: u8) -> String {
    let percent = usize::from(percent.min(100));
    let filled = percent * PROGRESS_BAR_WIDTH / 100;
    let mut bar = String::with_capacity(PROGRESS_BAR_WIDTH + 2);
    bar.push('[');
    bar.extend(std::iter::repeat(BAR_FILLED).take(filled));
    bar.extend(std::iter::repeat(BAR_EMPTY).take(PROGRESS_BAR_WIDTH - filled));
    bar.push(']');
    bar
}

fn progress_line(view: &TimelineView) -> String {
    let mut line = format!(
        "{} {:>3}%",
        progress_bar(view.overall_progress),
        view.overall_progress
    );
    if let Some(stage) = view.current_stage {
        line.push_str(&format!(" | {}", stage.label()));
    }
    if let Some(eta) = view.eta_seconds {
        line.push_str(&format!(" | ~{eta}s remaining"));
    }
    line
}

fn stage_line(stages: &[StageIndicator]) -> String {
    stages
        .iter()
        .map(|indicator| {
            let mark = match indicator.status {
                StageStatus::Done => "x",
                StageStatus::Active => ">",
                StageStatus::Pending => " ",
            };
            format!("[{mark}] {}", indicator.stage.label())
        })
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebook_core::{update, IncomingEvent, Msg, RunOutcome, RunState, SourcePayload};
    use pretty_assertions::assert_eq;

    fn event(run_id: u64, kind: &str, content: &str, at_ms: u64) -> Msg {
        Msg::EventReceived {
            run_id,
            event: IncomingEvent {
                kind: Some(kind.to_string()),
                content: content.to_string(),
                elapsed_seconds: at_ms / 1000,
                progress: None,
            },
            received_ms: at_ms,
        }
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(0), format!("[{}]", ".".repeat(30)));
        assert_eq!(progress_bar(50), format!("[{}{}]", "#".repeat(15), ".".repeat(15)));
        assert_eq!(progress_bar(100), format!("[{}]", "#".repeat(30)));
    }

    #[test]
    fn only_new_or_changed_rows_are_printed() {
        let source = SourcePayload::file("report.pdf", vec![1]).unwrap();
        let (state, _) = update(RunState::new(), Msg::RunRequested { source });
        let mut printer = TimelinePrinter::new("12:00:00", false);

        let (state, _) = update(state, event(1, "progress", "Extracting text 50%", 1_000));
        let lines = printer.render(&state.view());
        assert_eq!(
            lines,
            vec![
                "Processing document: report.pdf (PDF) at 12:00:00".to_string(),
                "== Processing ==".to_string(),
                "  -- Text Extraction".to_string(),
                "  [  1s] Extracting text 50% (50%)".to_string(),
                format!("{} {:>3}% | Text Extraction | ~9s remaining", progress_bar(10), 10),
            ]
        );

        assert!(printer.render(&state.view()).is_empty());

        let (state, _) = update(state, event(1, "progress", "Extracting text 100%", 2_000));
        let lines = printer.render(&state.view());
        assert_eq!(lines[0], "~ [  2s] Extracting text 100% (100%)");
    }

    #[test]
    fn footer_reports_failure_once() {
        let (state, _) = update(
            RunState::new(),
            Msg::RunRequested {
                source: SourcePayload::text("notes").unwrap(),
            },
        );
        let mut printer = TimelinePrinter::new("now", false);
        printer.render(&state.view());

        let (state, _) = update(
            state,
            Msg::RunFinished {
                run_id: 1,
                outcome: RunOutcome::Failed("Server responded with status: 500".into()),
                finished_ms: 10,
            },
        );
        let lines = printer.render(&state.view());
        assert!(lines.contains(&"Error: Server responded with status: 500".to_string()));
        assert!(printer.render(&state.view()).is_empty());
    }

    #[test]
    fn hidden_thinking_is_announced() {
        let (state, _) = update(
            RunState::new(),
            Msg::RunRequested {
                source: SourcePayload::text("notes").unwrap(),
            },
        );
        let (state, _) = update(state, event(1, "summary", "<think>plan</think>Summary", 100));
        let mut printer = TimelinePrinter::new("now", false);
        let lines = printer.render(&state.view());
        assert!(lines.contains(&format!("{INDENT}(thinking hidden)")));

        let mut verbose = TimelinePrinter::new("now", true);
        let lines = verbose.render(&state.view());
        assert!(lines.contains(&format!("{INDENT}| plan")));
    }
}
