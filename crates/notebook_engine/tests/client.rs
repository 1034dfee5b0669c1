use std::sync::{Arc, Mutex};
use std::time::Duration;

use notebook_engine::{
    CancellationToken, EngineEvent, FailureKind, ProcessingSettings, Processor, ProgressSink,
    ReqwestProcessor, UploadPayload,
};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Records events and cancels the run as soon as the first one arrives.
struct CancelOnFirstEvent {
    events: Mutex<Vec<EngineEvent>>,
    cancel: CancellationToken,
}

impl ProgressSink for CancelOnFirstEvent {
    fn emit(&self, event: EngineEvent) {
        if matches!(event, EngineEvent::Event { .. }) {
            self.cancel.cancel();
        }
        self.events.lock().unwrap().push(event);
    }
}

/// Reads one HTTP request: headers, then `content-length` bytes of body.
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = socket.read(&mut chunk).await.unwrap();
        if read == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..read]);
        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let body_len = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok());
        match body_len {
            Some(len) if buf.len() < header_end + 4 + len => continue,
            Some(_) => return,
            None if buf.ends_with(b"0\r\n\r\n") => return,
            None => continue,
        }
    }
}

fn processor_for(server: &MockServer, route: &str) -> ReqwestProcessor {
    ReqwestProcessor::new(ProcessingSettings {
        endpoint: format!("{}{}", server.uri(), route),
        ..ProcessingSettings::default()
    })
}

fn event_stream(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/event-stream")
}

#[tokio::test]
async fn stream_events_arrive_in_order_and_bad_frames_are_skipped() {
    notebook_logging::initialize_for_tests();
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"type\":\"status\",\"content\":\"Extracting text\",\"elapsed_seconds\":1}\n\n",
        "data: {broken\n\n",
        "data: {\"type\":\"progress\",\"content\":\"Processing images 45%\",\"elapsed_seconds\":2}\n\n",
        "data: {\"type\":\"completion\",\"content\":\"Finished\",\"elapsed_seconds\":3}",
    );
    Mock::given(method("POST"))
        .and(path("/process-pdf"))
        .respond_with(event_stream(body))
        .mount(&server)
        .await;

    let processor = processor_for(&server, "/process-pdf");
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    let report = processor
        .process(1, &UploadPayload::Text("notes".into()), &cancel, &sink)
        .await
        .expect("stream ok");

    assert_eq!(report.frames_decoded, 3);
    assert_eq!(report.frames_skipped, 1);
    assert_eq!(report.bytes_received, body.len() as u64);

    let events = sink.take();
    assert_eq!(events.len(), 4);
    let kinds: Vec<_> = events
        .iter()
        .map(|event| match event {
            EngineEvent::Event { run_id, event } => {
                assert_eq!(*run_id, 1);
                event.kind.clone().unwrap_or_default()
            }
            EngineEvent::FrameSkipped { .. } => "skipped".to_string(),
            EngineEvent::RunFinished { .. } => "finished".to_string(),
        })
        .collect();
    assert_eq!(kinds, vec!["status", "skipped", "progress", "completion"]);
}

#[tokio::test]
async fn url_payload_is_sent_as_multipart_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .and(body_string_contains("name=\"url\""))
        .and(body_string_contains("https://example.com/article"))
        .respond_with(event_stream("data: {\"type\":\"status\",\"content\":\"ok\"}\n\n"))
        .expect(1)
        .mount(&server)
        .await;

    let processor = processor_for(&server, "/process");
    let sink = TestSink::new();
    let payload = UploadPayload::Url("https://example.com/article".into());
    let report = processor
        .process(2, &payload, &CancellationToken::new(), &sink)
        .await
        .expect("stream ok");
    assert_eq!(report.frames_decoded, 1);
}

#[tokio::test]
async fn file_payload_carries_name_and_guessed_mime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .and(body_string_contains("name=\"file\"; filename=\"report.pdf\""))
        .and(body_string_contains("application/pdf"))
        .respond_with(event_stream(""))
        .expect(1)
        .mount(&server)
        .await;

    let processor = processor_for(&server, "/process");
    let payload = UploadPayload::File {
        file_name: "report.pdf".into(),
        bytes: b"%PDF-1.7 test".to_vec(),
    };
    let report = processor
        .process(3, &payload, &CancellationToken::new(), &TestSink::new())
        .await
        .expect("stream ok");
    assert_eq!(report.frames_decoded, 0);
}

#[tokio::test]
async fn non_success_status_is_a_typed_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let processor = processor_for(&server, "/process");
    let sink = TestSink::new();
    let err = processor
        .process(4, &UploadPayload::Text("x".into()), &CancellationToken::new(), &sink)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(502));
    assert_eq!(err.message, "Server responded with status: 502");
    assert!(!err.is_cancelled());
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn invalid_endpoint_fails_before_sending() {
    let processor = ReqwestProcessor::new(ProcessingSettings {
        endpoint: "not a url".into(),
        ..ProcessingSettings::default()
    });
    let err = processor
        .process(5, &UploadPayload::Text("x".into()), &CancellationToken::new(), &TestSink::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidEndpoint);
}

#[tokio::test]
async fn cancelled_token_aborts_without_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(event_stream("data: {\"type\":\"status\"}\n\n"))
        .mount(&server)
        .await;

    let processor = processor_for(&server, "/process");
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = processor
        .process(6, &UploadPayload::Text("x".into()), &cancel, &sink)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn cancel_interrupts_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(event_stream("data: {\"type\":\"status\"}\n\n").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let processor = processor_for(&server, "/process");
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        processor.process(7, &UploadPayload::Text("x".into()), &cancel, &sink),
    )
    .await
    .expect("cancellation should end the run promptly");
    assert_eq!(result.unwrap_err().kind, FailureKind::Cancelled);
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn cancel_mid_stream_discards_the_partial_frame() {
    notebook_logging::initialize_for_tests();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n",
            )
            .await
            .unwrap();
        let body = concat!(
            "data: {\"type\":\"status\",\"content\":\"Extracting text\",\"elapsed_seconds\":1}\n\n",
            "data: {\"type\":\"progress\",\"content\":\"Processing ima",
        );
        let chunk = format!("{:x}\r\n{}\r\n", body.len(), body);
        socket.write_all(chunk.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        // Hold the connection open without finishing the frame.
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });

    let processor = ReqwestProcessor::new(ProcessingSettings {
        endpoint: format!("http://{addr}/process-pdf"),
        ..ProcessingSettings::default()
    });
    let cancel = CancellationToken::new();
    let sink = CancelOnFirstEvent {
        events: Mutex::new(Vec::new()),
        cancel: cancel.clone(),
    };

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        processor.process(11, &UploadPayload::Text("notes".into()), &cancel, &sink),
    )
    .await
    .expect("cancel did not stop the stream");
    server.abort();

    assert_eq!(result.unwrap_err().kind, FailureKind::Cancelled);
    let events = sink.events.into_inner().unwrap();
    assert_eq!(events.len(), 1);
    match &events[0] {
        EngineEvent::Event { run_id, event } => {
            assert_eq!(*run_id, 11);
            assert_eq!(event.content, "Extracting text");
        }
        other => panic!("unexpected {other:?}"),
    }
}
