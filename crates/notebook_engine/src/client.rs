use std::time::Duration;

use futures_util::StreamExt;
use notebook_logging::{nb_debug, nb_info, nb_warn};
use reqwest::multipart::{Form, Part};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::sse::FrameSplitter;
use crate::wire::decode_frame;
use crate::{EngineEvent, FailureKind, RunId, StreamError, StreamReport, UploadPayload};

const LOGGED_FRAME_CHARS: usize = 120;

#[derive(Debug, Clone)]
pub struct ProcessingSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Longest silence tolerated between two chunks.
    pub idle_timeout: Duration,
    pub max_frame_bytes: usize,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/process-pdf".to_string(),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(120),
            max_frame_bytes: 1024 * 1024,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait::async_trait]
pub trait Processor: Send + Sync {
    /// Uploads `payload` and streams decoded events into `sink` until the
    /// transport closes or `cancel` fires.
    async fn process(
        &self,
        run_id: RunId,
        payload: &UploadPayload,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<StreamReport, StreamError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestProcessor {
    settings: ProcessingSettings,
}

impl ReqwestProcessor {
    pub fn new(settings: ProcessingSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, StreamError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| StreamError::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Processor for ReqwestProcessor {
    async fn process(
        &self,
        run_id: RunId,
        payload: &UploadPayload,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<StreamReport, StreamError> {
        let endpoint = reqwest::Url::parse(&self.settings.endpoint)
            .map_err(|err| StreamError::new(FailureKind::InvalidEndpoint, err.to_string()))?;
        let client = self.build_client()?;
        let form = build_form(payload)?;

        nb_info!(
            "Run {} posting {} payload to {}",
            run_id,
            payload.kind(),
            endpoint
        );

        let request = client.post(endpoint).multipart(form).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(run_id)),
            result = request => result.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            nb_warn!("Run {} rejected with status {}", run_id, status);
            return Err(StreamError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("Server responded with status: {}", status.as_u16()),
            ));
        }

        let mut splitter = FrameSplitter::new(self.settings.max_frame_bytes);
        let mut report = StreamReport::default();
        let mut stream = std::pin::pin!(response.bytes_stream());

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    splitter.discard();
                    return Err(cancelled(run_id));
                }
                next = tokio::time::timeout(self.settings.idle_timeout, stream.next()) => next,
            };
            let chunk = match next {
                Err(_) => {
                    return Err(StreamError::new(
                        FailureKind::Timeout,
                        format!(
                            "no data for {}s",
                            self.settings.idle_timeout.as_secs_f32()
                        ),
                    ))
                }
                Ok(None) => break,
                Ok(Some(chunk)) => chunk.map_err(map_reqwest_error)?,
            };

            report.bytes_received += chunk.len() as u64;
            let frames = splitter.push(&chunk).map_err(|overflow| {
                StreamError::new(
                    FailureKind::FrameTooLarge {
                        max_bytes: overflow.max_bytes,
                    },
                    overflow.to_string(),
                )
            })?;
            for frame in frames {
                if cancel.is_cancelled() {
                    splitter.discard();
                    return Err(cancelled(run_id));
                }
                dispatch_frame(run_id, &frame, &mut report, sink);
            }
        }

        if let Some(frame) = splitter.finish() {
            dispatch_frame(run_id, &frame, &mut report, sink);
        }

        nb_info!(
            "Run {} stream closed: {} frames decoded, {} skipped, {} bytes",
            run_id,
            report.frames_decoded,
            report.frames_skipped,
            report.bytes_received
        );
        Ok(report)
    }
}

fn dispatch_frame(
    run_id: RunId,
    frame: &str,
    report: &mut StreamReport,
    sink: &dyn ProgressSink,
) {
    match decode_frame(frame) {
        Ok(event) => {
            nb_debug!("Run {} event type={:?}", run_id, event.kind);
            report.frames_decoded += 1;
            sink.emit(EngineEvent::Event { run_id, event });
        }
        Err(err) => {
            let preview: String = frame.chars().take(LOGGED_FRAME_CHARS).collect();
            nb_warn!(
                "Run {} skipping frame: {} (frame: {:?})",
                run_id,
                err,
                preview
            );
            report.frames_skipped += 1;
            sink.emit(EngineEvent::FrameSkipped {
                run_id,
                reason: err.to_string(),
            });
        }
    }
}

fn build_form(payload: &UploadPayload) -> Result<Form, StreamError> {
    let form = Form::new();
    match payload {
        UploadPayload::File { file_name, bytes } => {
            let mime = mime_guess::from_path(file_name).first_or_octet_stream();
            let part = Part::bytes(bytes.clone())
                .file_name(file_name.clone())
                .mime_str(mime.essence_str())
                .map_err(|err| StreamError::new(FailureKind::InvalidPayload, err.to_string()))?;
            Ok(form.part("file", part))
        }
        UploadPayload::Url(url) => Ok(form.text("url", url.clone())),
        UploadPayload::Text(text) => Ok(form.text("text", text.clone())),
    }
}

fn cancelled(run_id: RunId) -> StreamError {
    nb_info!("Run {} cancelled; transfer aborted", run_id);
    StreamError::cancelled()
}

fn map_reqwest_error(err: reqwest::Error) -> StreamError {
    if err.is_timeout() {
        return StreamError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return StreamError::new(FailureKind::InvalidEndpoint, err.to_string());
    }
    StreamError::new(FailureKind::Network, err.to_string())
}
