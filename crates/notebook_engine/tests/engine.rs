use std::sync::Arc;

use notebook_engine::{
    CancellationToken, EngineEvent, EngineHandle, Processor, ProgressSink, RunId, StreamError,
    StreamReport, UploadPayload, WireEvent,
};

/// Emits one event, then either finishes or waits for cancellation.
struct ScriptedProcessor {
    wait_for_cancel: bool,
}

#[async_trait::async_trait]
impl Processor for ScriptedProcessor {
    async fn process(
        &self,
        run_id: RunId,
        _payload: &UploadPayload,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<StreamReport, StreamError> {
        sink.emit(EngineEvent::Event {
            run_id,
            event: WireEvent {
                kind: Some("status".to_string()),
                content: "Extracting text".to_string(),
                ..WireEvent::default()
            },
        });
        if self.wait_for_cancel {
            cancel.cancelled().await;
            return Err(StreamError {
                kind: notebook_engine::FailureKind::Cancelled,
                message: "cancelled".to_string(),
            });
        }
        Ok(StreamReport {
            frames_decoded: 1,
            ..StreamReport::default()
        })
    }
}

fn handle(wait_for_cancel: bool) -> EngineHandle {
    EngineHandle::with_processor(Arc::new(ScriptedProcessor { wait_for_cancel }))
}

#[tokio::test]
async fn events_then_finish_are_delivered_in_order() {
    let mut engine = handle(false);
    assert!(engine.start(1, UploadPayload::Text("notes".into())));
    assert_eq!(engine.active_run(), Some(1));

    match engine.recv().await {
        Some(EngineEvent::Event { run_id, event }) => {
            assert_eq!(run_id, 1);
            assert_eq!(event.content, "Extracting text");
        }
        other => panic!("unexpected {other:?}"),
    }
    match engine.recv().await {
        Some(EngineEvent::RunFinished { run_id, result }) => {
            assert_eq!(run_id, 1);
            assert_eq!(result.unwrap().frames_decoded, 1);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(engine.active_run(), None);
}

#[tokio::test]
async fn second_start_is_rejected_while_active() {
    let mut engine = handle(true);
    assert!(engine.start(1, UploadPayload::Text("a".into())));
    assert!(!engine.start(2, UploadPayload::Text("b".into())));
    assert_eq!(engine.active_run(), Some(1));
}

#[tokio::test]
async fn cancel_frees_the_slot_and_drops_late_events() {
    let mut engine = handle(true);
    assert!(engine.start(1, UploadPayload::Text("a".into())));
    engine.cancel(1);
    assert_eq!(engine.active_run(), None);

    assert!(engine.start(2, UploadPayload::Text("b".into())));
    assert_eq!(engine.active_run(), Some(2));

    // Run 1 still emits its event and a cancelled finish; neither surfaces.
    match engine.recv().await {
        Some(EngineEvent::Event { run_id, .. }) => assert_eq!(run_id, 2),
        other => panic!("unexpected {other:?}"),
    }
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    assert!(engine.try_recv().is_none());
    assert_eq!(engine.active_run(), Some(2));

    engine.cancel(2);
    assert_eq!(engine.active_run(), None);
}

#[tokio::test]
async fn cancel_for_other_run_is_ignored() {
    let mut engine = handle(true);
    assert!(engine.start(3, UploadPayload::Text("a".into())));
    engine.cancel(9);

    let first = engine.recv().await;
    assert!(matches!(first, Some(EngineEvent::Event { run_id: 3, .. })));
    tokio::task::yield_now().await;
    assert!(engine.try_recv().is_none());
    assert_eq!(engine.active_run(), Some(3));
}
