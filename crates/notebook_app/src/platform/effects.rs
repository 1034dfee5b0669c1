use notebook_core::{Effect, IncomingEvent, Msg, RunOutcome, SourcePayload};
use notebook_engine::{EngineEvent, EngineHandle, ProcessingSettings, UploadPayload, WireEvent};
use notebook_logging::{nb_info, nb_warn};

pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(settings: ProcessingSettings) -> Self {
        Self::with_engine(EngineHandle::new(settings))
    }

    pub fn with_engine(engine: EngineHandle) -> Self {
        Self { engine }
    }

    /// Executes effects. Returns messages to feed straight back into `update`,
    /// which is how a run the engine refused gets failed instead of left running.
    pub fn enqueue(&mut self, effects: Vec<Effect>, now_ms: u64) -> Vec<Msg> {
        let mut feedback = Vec::new();
        for effect in effects {
            match effect {
                Effect::StartRun { run_id, source } => {
                    nb_info!("StartRun run_id={} source={:?}", run_id, source);
                    if !self.engine.start(run_id, map_source(source)) {
                        feedback.push(Msg::RunFinished {
                            run_id,
                            outcome: RunOutcome::Failed(ENGINE_BUSY.to_string()),
                            finished_ms: now_ms,
                        });
                    }
                }
                Effect::CancelRun { run_id } => {
                    self.engine.cancel(run_id);
                }
                Effect::NotifyCompleted { run_id } => {
                    nb_info!("Run {} completed", run_id);
                }
                Effect::NotifyFailed { run_id, error } => {
                    nb_warn!("Run {} failed: {}", run_id, error);
                }
            }
        }
        feedback
    }

    /// Waits for the next engine event and turns it into a message.
    /// `now_ms` reads the run clock at receipt.
    pub async fn next_msg(&mut self, now_ms: impl Fn() -> u64) -> Option<Msg> {
        let event = self.engine.recv().await?;
        Some(map_event(event, now_ms()))
    }
}

const ENGINE_BUSY: &str = "another run is still in progress";

fn map_event(event: EngineEvent, now_ms: u64) -> Msg {
    match event {
        EngineEvent::Event { run_id, event } => Msg::EventReceived {
            run_id,
            event: map_wire_event(event),
            received_ms: now_ms,
        },
        EngineEvent::FrameSkipped { run_id, .. } => Msg::FrameSkipped { run_id },
        EngineEvent::RunFinished { run_id, result } => {
            let outcome = match result {
                Ok(report) => {
                    nb_info!(
                        "Run {} stream ended: {} frames, {} skipped",
                        run_id,
                        report.frames_decoded,
                        report.frames_skipped
                    );
                    RunOutcome::Completed
                }
                Err(err) if err.is_cancelled() => RunOutcome::Cancelled,
                Err(err) => {
                    nb_warn!("Run {} transport failure ({}): {}", run_id, err.kind, err);
                    RunOutcome::Failed(err.message)
                }
            };
            Msg::RunFinished {
                run_id,
                outcome,
                finished_ms: now_ms,
            }
        }
    }
}

fn map_wire_event(event: WireEvent) -> IncomingEvent {
    IncomingEvent {
        kind: event.kind,
        content: event.content,
        elapsed_seconds: event.elapsed_seconds,
        progress: event.progress,
    }
}

fn map_source(source: SourcePayload) -> UploadPayload {
    match source {
        SourcePayload::File { name, bytes } => UploadPayload::File {
            file_name: name,
            bytes,
        },
        SourcePayload::Url(url) => UploadPayload::Url(url),
        SourcePayload::Text(text) => UploadPayload::Text(text),
    }
}
