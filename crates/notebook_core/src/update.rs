use crate::{Effect, Msg, RunOutcome, RunState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    let effects = match msg {
        Msg::RunRequested { source } => {
            // A second run while one is in flight is rejected, not queued.
            if state.is_running() {
                return (state, Vec::new());
            }
            let run_id = state.start_run(&source);
            vec![Effect::StartRun { run_id, source }]
        }
        Msg::EventReceived {
            run_id,
            event,
            received_ms,
        } => {
            if state.accepts(run_id) {
                state.apply_event(event, received_ms);
            }
            Vec::new()
        }
        Msg::FrameSkipped { run_id } => {
            if state.accepts(run_id) {
                state.record_skipped_frame();
            }
            Vec::new()
        }
        Msg::RunFinished {
            run_id,
            outcome,
            finished_ms,
        } => {
            if !state.accepts(run_id) {
                return (state, Vec::new());
            }
            match outcome {
                RunOutcome::Completed => {
                    state.complete(finished_ms);
                    vec![Effect::NotifyCompleted { run_id }]
                }
                RunOutcome::Failed(error) => {
                    state.fail(error.clone(), finished_ms);
                    vec![Effect::NotifyFailed { run_id, error }]
                }
                RunOutcome::Cancelled => {
                    state.mark_cancelled(finished_ms);
                    Vec::new()
                }
            }
        }
        Msg::CancelRequested { at_ms } => match state.active_run() {
            Some(run_id) => {
                state.cancel_by_user(at_ms);
                vec![Effect::CancelRun { run_id }]
            }
            None => Vec::new(),
        },
        Msg::ThinkingToggled { index } => {
            state.toggle_thinking(index);
            Vec::new()
        }
        Msg::TornDown => {
            let effects = match state.active_run() {
                Some(run_id) => vec![Effect::CancelRun { run_id }],
                None => Vec::new(),
            };
            state.reset();
            effects
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
