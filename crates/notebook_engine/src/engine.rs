use std::sync::Arc;

use notebook_logging::{nb_debug, nb_info, nb_warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::{ChannelProgressSink, ProcessingSettings, Processor, ReqwestProcessor};
use crate::{EngineEvent, RunId, UploadPayload};

/// Owns at most one processing run and the channel its events arrive on.
///
/// Runs are spawned onto the ambient tokio runtime, so `start` must be called
/// from inside one. Dropping the handle aborts the active run.
pub struct EngineHandle {
    processor: Arc<dyn Processor>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    event_rx: mpsc::UnboundedReceiver<EngineEvent>,
    active: Option<(RunId, CancellationToken)>,
}

impl EngineHandle {
    pub fn new(settings: ProcessingSettings) -> Self {
        Self::with_processor(Arc::new(ReqwestProcessor::new(settings)))
    }

    pub fn with_processor(processor: Arc<dyn Processor>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            processor,
            event_tx,
            event_rx,
            active: None,
        }
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.active.as_ref().map(|(run_id, _)| *run_id)
    }

    /// Starts `run_id`. Returns `false` without starting anything while
    /// another run is still active.
    pub fn start(&mut self, run_id: RunId, payload: UploadPayload) -> bool {
        if let Some(active) = self.active_run() {
            nb_warn!("Run {} rejected: run {} still active", run_id, active);
            return false;
        }

        let token = CancellationToken::new();
        self.active = Some((run_id, token.clone()));

        let processor = self.processor.clone();
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let sink = ChannelProgressSink::new(event_tx.clone());
            let result = processor.process(run_id, &payload, &token, &sink).await;
            let _ = event_tx.send(EngineEvent::RunFinished { run_id, result });
        });
        true
    }

    /// Cancels `run_id` and frees the slot for the next run. Whatever the
    /// cancelled run still emits is dropped on receipt.
    pub fn cancel(&mut self, run_id: RunId) {
        if self.active_run() != Some(run_id) {
            return;
        }
        if let Some((_, token)) = self.active.take() {
            nb_info!("Cancelling run {}", run_id);
            token.cancel();
        }
    }

    /// Waits for the next event of the active run.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        loop {
            let event = self.event_rx.recv().await?;
            if self.admit(&event) {
                return Some(event);
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        loop {
            let event = self.event_rx.try_recv().ok()?;
            if self.admit(&event) {
                return Some(event);
            }
        }
    }

    /// Only the active run gets through; its `RunFinished` releases the slot.
    fn admit(&mut self, event: &EngineEvent) -> bool {
        let run_id = event.run_id();
        if self.active_run() != Some(run_id) {
            nb_debug!("Dropping late event from run {}", run_id);
            return false;
        }
        if matches!(event, EngineEvent::RunFinished { .. }) {
            self.active = None;
        }
        true
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if let Some((_, token)) = self.active.take() {
            token.cancel();
        }
    }
}
